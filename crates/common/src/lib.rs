//! Client assertion issuer core.
//!
//! Issues short-lived RS256 client assertions for OAuth2 `private_key_jwt`
//! client authentication and publishes the matching public key as a JSON Web
//! Key Set.
//!
//! # Modules
//!
//! - [`client_assertion`]: Key lifecycle, key set publication and assertion signing
//! - [`error`]: Error types and error handling utilities
//! - [`settings`]: Configuration loading and validation
//! - [`test_support`]: Testing utilities

pub mod client_assertion;
pub mod error;
pub mod settings;
