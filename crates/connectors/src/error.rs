//! Connector-level error type.

use thiserror::Error;

/// Errors a connector may return from `check`, `execute` or `hook`.
///
/// The engine never propagates these: at its boundary every variant is
/// downgraded to a `FAILURE` status for the step that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The external service call failed or returned something unusable.
    #[error("upstream call failed: {0}")]
    Upstream(String),

    /// The step payload is missing a field or has the wrong shape.
    #[error("invalid step payload: {0}")]
    InvalidPayload(String),

    /// The stored comparison data could not be interpreted.
    #[error("invalid comparison data: {0}")]
    InvalidComparisonData(String),

    /// The connector does not implement the requested capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
