//! Common error handling and certificate inspection
pub mod errors;
pub mod peer;
