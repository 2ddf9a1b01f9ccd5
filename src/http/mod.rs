//! HTTP protocol layer module
//!
//! HTTP helpers shared by the request handlers, independent of module
//! preloading: content types, cache validation and response builders.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_301_response, build_304_response, build_404_response, build_405_response, build_file_response,
    build_options_response,
};
