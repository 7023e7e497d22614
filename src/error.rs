//! Error types for the case-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**: the operation cannot proceed at all
//!   (input file missing, malformed JSON, invalid configuration). Returned as
//!   `Err(ExtractError)` from loading, configuration and document assembly.
//!
//! * [`LookupError`]: **Non-fatal**: one step of one resolver failed
//!   (timeout, HTTP 503 after retries, unexpected JSON shape). It never
//!   escapes a resolver: [`crate::resolve::lenient`] maps it to "no result"
//!   and the fallback chain moves on.
//!
//! Resolvers therefore return plain strings. An empty string means either
//! "not found" or "every provider failed"; the difference is only visible in
//! the `warn!` logs emitted by the policy.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the case-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but its content does not have the expected shape.
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    /// The converted main text never mentions a case report.
    #[error("The document does not appear to be a case report.")]
    NotACaseReport,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// reqwest refused the client configuration (TLS backend, headers).
    #[error("Failed to build HTTP client: {0}")]
    HttpClientBuild(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-fatal failure of a single resolver step.
///
/// `provider` names the upstream service (`pubmed`, `wikidata-search`,
/// `wikidata-claims`, `wikidata-sparql`, `ols`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Connection refused, DNS failure, TLS error, body read error.
    #[error("{provider}: transport error: {detail}")]
    Transport {
        provider: &'static str,
        detail: String,
    },

    /// Connect or request timeout elapsed.
    #[error("{provider}: request timed out")]
    Timeout { provider: &'static str },

    /// Final response after retries was not a 2xx.
    #[error("{provider}: HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    /// Response body was not JSON or lacked the expected fields.
    #[error("{provider}: malformed response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}

impl LookupError {
    /// The upstream service this failure came from.
    pub fn provider(&self) -> &'static str {
        match self {
            LookupError::Transport { provider, .. }
            | LookupError::Timeout { provider }
            | LookupError::Status { provider, .. }
            | LookupError::Malformed { provider, .. } => *provider,
        }
    }
}
