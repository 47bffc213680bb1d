//! HTTP server for Scribe

pub mod http;

pub use http::{run, AppState, Collections};
