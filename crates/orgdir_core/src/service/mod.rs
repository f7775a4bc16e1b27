//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store fetches into directory query operations.
//! - Keep callers decoupled from storage and session details.

pub mod query_service;
pub mod read_session;
