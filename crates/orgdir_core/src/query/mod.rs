//! Query building blocks: geo filtering, hierarchy resolution and the error
//! kinds shared by the query engine.
//!
//! # See also
//! - `service::query_service` for the composed directory operations.

pub mod error;
pub mod geo;
pub mod hierarchy;
