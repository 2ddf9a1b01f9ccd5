//! Request handler module
//!
//! Routes requests to the static responder, which attaches module preload
//! hints to the scripts it serves.

pub mod router;
pub mod static_files;

pub use router::handle_request;
