//! # linkheart-shared
//!
//! Identifier newtypes, decision tags, constants and validation errors shared
//! by the store and the HTTP server.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ValidationError;
pub use types::{Decision, Gender, MatchId, MessageId, UserId};
