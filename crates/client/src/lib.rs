//! HTTP transport for the antigenapp REST API.
//!
//! [`EntityApi`] is the seam the entity stores talk through; [`RestClient`]
//! is its `reqwest` implementation. Bodies cross the seam as
//! `serde_json::Value` so the stores own all typed decoding.

pub mod api;
pub mod config;
pub mod error;
pub mod query;

pub use api::{EntityApi, RestClient};
pub use config::ClientConfig;
pub use error::{ApiRejection, ClientError, ErrorKind};
pub use query::query_pairs;
