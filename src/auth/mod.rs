//! Azure AD authentication module.
//!
//! Provides the OAuth2 client-credentials grant and secret-holding wrappers.

pub mod oauth;
pub mod secure;
