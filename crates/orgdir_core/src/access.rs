//! API key gate in front of directory queries.
//!
//! # Responsibility
//! - Decide whether a request may reach the query engine, based on the
//!   credential header value alone.
//!
//! # Invariants
//! - The expected key is injected once at construction; the gate never reads
//!   process environment.
//! - With no configured key every request is rejected.
//! - Key comparison takes time independent of where the values differ.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Header carrying the credential.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Credential rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Header absent or blank.
    MissingCredential,
    /// Header present but does not match.
    InvalidCredential,
    /// Gate has no key to compare against.
    NotConfigured,
}

impl AccessError {
    /// HTTP status a routing layer should answer with.
    pub fn http_status(&self) -> u16 {
        403
    }
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing {API_KEY_HEADER} header"),
            Self::InvalidCredential => write!(f, "invalid API key"),
            Self::NotConfigured => write!(f, "API key is not configured"),
        }
    }
}

impl Error for AccessError {}

/// Validates the `X-API-Key` credential.
#[derive(Clone)]
pub struct ApiKeyGate {
    expected: Option<String>,
}

impl ApiKeyGate {
    /// Creates a gate; blank keys count as not configured.
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Checks one request's header value.
    pub fn verify(&self, header: Option<&str>) -> Result<(), AccessError> {
        let outcome = match (header.filter(|value| !value.is_empty()), &self.expected) {
            (None, _) => Err(AccessError::MissingCredential),
            (Some(_), None) => Err(AccessError::NotConfigured),
            (Some(provided), Some(expected)) => {
                if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
                    Ok(())
                } else {
                    Err(AccessError::InvalidCredential)
                }
            }
        };

        if let Err(err) = outcome {
            warn!(
                "event=access_denied module=access status=rejected reason={:?}",
                err
            );
        }
        outcome
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::{constant_time_eq, AccessError, ApiKeyGate};

    #[test]
    fn matching_key_passes() {
        let gate = ApiKeyGate::new(Some("secret".into()));
        assert!(gate.verify(Some("secret")).is_ok());
    }

    #[test]
    fn missing_or_blank_header_is_rejected() {
        let gate = ApiKeyGate::new(Some("secret".into()));
        assert_eq!(gate.verify(None), Err(AccessError::MissingCredential));
        assert_eq!(gate.verify(Some("")), Err(AccessError::MissingCredential));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let gate = ApiKeyGate::new(Some("secret".into()));
        assert_eq!(
            gate.verify(Some("secreT")),
            Err(AccessError::InvalidCredential)
        );
        assert_eq!(
            gate.verify(Some("secret-longer")),
            Err(AccessError::InvalidCredential)
        );
    }

    #[test]
    fn unconfigured_gate_rejects_everything() {
        let gate = ApiKeyGate::new(Some("  ".into()));
        assert!(!gate.is_configured());
        assert_eq!(gate.verify(Some("anything")), Err(AccessError::NotConfigured));
        assert_eq!(AccessError::NotConfigured.http_status(), 403);
    }

    #[test]
    fn debug_output_hides_key() {
        let gate = ApiKeyGate::new(Some("secret".into()));
        assert!(!format!("{gate:?}").contains("secret"));
    }

    #[test]
    fn constant_time_eq_compares_bytes() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
    }
}
