//! Result type aliases for Relay.

use crate::RelayError;

/// A specialized `Result` type for Relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
