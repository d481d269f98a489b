//! Core types shared across the Relay workspace.
//!
//! Relay runs application jobs outside the request lifecycle by spawning a
//! detached OS process per execution attempt. This crate holds the pieces
//! every other crate needs: the unified error enum, result alias, and the
//! typed ID wrappers for job records and dispatch requests.

pub mod error;
pub mod id;
pub mod result;

pub use error::RelayError;
pub use id::{JobId, RequestId};
pub use result::RelayResult;
