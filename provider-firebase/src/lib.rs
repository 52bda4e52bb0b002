//! # Firebase Provider
//!
//! Production backend adapter: one connector implementing the
//! `bridge-traits` store contracts and the `core-auth` identity gateway
//! against Firebase's REST surfaces (Firestore, Storage, Identity Toolkit).
//!
//! The connector is transport-agnostic - it speaks through whatever
//! [`HttpClient`](bridge_traits::http::HttpClient) the host provides
//! (`bridge-desktop` ships the reqwest one).

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{FirebaseConfig, FirebaseConnector};
pub use error::FirebaseError;
