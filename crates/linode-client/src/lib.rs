//! Linode API v4 Client
//!
//! A Rust client library for the parts of the Linode API v4 a cloud controller
//! manager needs. Provides type-safe models and methods for NodeBalancers,
//! Cloud Firewalls and Linode instances.
//!
//! # Example
//!
//! ```no_run
//! use linode_client::{LinodeClient, ListFilter, DEFAULT_API_URL};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client
//! let client = LinodeClient::new(
//!     DEFAULT_API_URL.to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // Find a NodeBalancer by label
//! let nodebalancers = client
//!     .list_nodebalancers(Some(&ListFilter::label("a4f2e0c1")))
//!     .await?;
//!
//! // List every instance on the account
//! let instances = client.list_instances(None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **NodeBalancers**: NodeBalancers, port configs (create/rebuild/delete) and backend nodes
//! - **Cloud Firewalls**: Firewalls, rule sets and device attachments
//! - **Instances**: Instance listing used for node metadata
//! - **Pagination**: Transparent `page`/`pages` traversal with `X-Filter` support
//! - **Mocking**: `MockLinodeClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod linode_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{DEFAULT_API_URL, LinodeClient};
pub use common::filter::ListFilter;
pub use common::{HttpClient, PaginatedResponse};
pub use error::LinodeError;
pub use linode_trait::LinodeClientTrait;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{MockLinodeClient, RecordedRequest, WrittenTls};
