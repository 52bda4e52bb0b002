//! # Desktop Bridge
//!
//! Concrete bridge implementations for desktop hosts. Currently just the
//! HTTP transport; the signage core has no local filesystem or credential
//! persistence to adapt.

pub mod http;

pub use http::ReqwestHttpClient;
