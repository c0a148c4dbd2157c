//! `connectors` crate — the capability traits every service connector
//! implements, the values they exchange with the engine, and the helpers
//! they share.
//!
//! The engine dispatches through [`TriggerConnector`] and
//! [`ActionConnector`] trait objects; it never sees a concrete connector.

pub mod builtin;
pub mod error;
pub mod flatten;
pub mod mock;
pub mod result;
pub mod snapshot;
pub mod traits;

pub use error::ConnectorError;
pub use result::{ActionRunResult, RunStatus, TriggerCheckResult, Variable, VariableValue};
pub use traits::{ActionConnector, ActionParams, TriggerConnector, TriggerKind, TriggerParams};
