//! Error handling for the connector runtime.
//!
//! - **Error Categories**: classification that drives lifecycle reactions
//! - **Unified Error Type**: `ConnectorError` consolidates seam errors
//! - **Error Context**: operation, connector, work and event identifiers
//! - **Result Type Alias**: `ConnectorResult<T>`
//!
//! # Error Categories
//!
//! | Category | Work unit | Cycle outcome |
//! |----------|-----------|---------------|
//! | Validation | never created | silently ends |
//! | Lookup | processed with error | handled, last run advances |
//! | Policy | processed with error | handled, last run advances |
//! | UserLogic | processed with error (best effort) | failed |
//! | Transport | n/a | stream consumer terminates |

mod category;
mod connector_error;
mod context;
mod result;

pub use category::ErrorCategory;
pub use connector_error::{BoxError, ConnectorError};
pub use context::ErrorContext;
pub use result::{ConnectorResult, ResultExt};
