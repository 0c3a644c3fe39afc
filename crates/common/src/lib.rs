//! Common types, protocol definitions, and errors shared by `protect` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
