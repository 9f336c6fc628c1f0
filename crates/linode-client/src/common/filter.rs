//! `X-Filter` support for list endpoints
//!
//! Linode list endpoints accept a JSON filter document in the `X-Filter`
//! header. Only field equality is modelled here.

use crate::error::LinodeError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Field-equality filter for list operations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ListFilter(Map<String, Value>);

impl ListFilter {
    /// Create an empty filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on an exact `label` match
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::new().eq("label", label.into())
    }

    /// Filter on an exact public `ipv4` match
    #[must_use]
    pub fn ipv4(address: impl Into<String>) -> Self {
        Self::new().eq("ipv4", address.into())
    }

    /// Add an equality condition on `field`
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Value a field is filtered on, if any
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// True when no condition is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize the filter into the `X-Filter` header value
    pub fn to_header(&self) -> Result<String, LinodeError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Evaluate the filter against a serialized resource
    ///
    /// Fields missing from the resource never match.
    pub fn matches(&self, resource: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| resource.get(field) == Some(expected))
    }
}
