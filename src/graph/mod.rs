//! Microsoft Graph integration.
//!
//! Resolves groups and applications by display name and manages the
//! owners of an application registration.

pub mod client;
pub mod models;
pub mod retry;

pub use client::GraphClient;
