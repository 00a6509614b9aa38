//! # strata_config
//!
//! Typed configuration materialization for Strata.
//!
//! Resolved documents arrive as text, either JSON or YAML. This crate maps
//! them onto declared Rust shapes with a few guarantees every downstream
//! consumer can rely on:
//!
//! - **Format by content**: the same call reads JSON and YAML
//! - **Null safety**: collections written as `null` come back empty; absent
//!   collections are empty as long as the field carries `#[serde(default)]`
//! - **Case-insensitive names**: `endpointAccess`, `endpoint_access` and
//!   `ENDPOINT-ACCESS` address the same field, and enum values match the same way
//! - **Null-free output**: [`Materializer::to_json`] and [`Materializer::to_yaml`]
//!   never emit null-valued fields
//!
//! ## Example
//!
//! ```rust
//! use serde::Deserialize;
//! use strata_config::Materializer;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Subnet {
//!     name: String,
//!     cidr_mask: u8,
//!     #[serde(default)]
//!     tags: Vec<String>,
//! }
//!
//! let subnet: Subnet = Materializer::materialize("subnet.yaml", "NAME: app\ncidr_mask: 24\ntags: null").unwrap();
//! assert_eq!(subnet.cidr_mask, 24);
//! assert!(subnet.tags.is_empty());
//! ```

pub mod error;
pub mod materializer;
mod tree;

pub use error::{ConfigError, ConfigResult};
pub use materializer::{DocumentFormat, Materializer};
pub use tree::same_name;
