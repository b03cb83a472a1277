//! Client assertion issuing.
//!
//! This module manages the single RSA signing key pair, publishes its public
//! half as a JSON Web Key Set, and signs RS256 client assertions for OAuth2
//! `private_key_jwt` client authentication.

pub mod key_source;
pub mod keys;
pub mod material;
pub mod responses;
pub mod signer;

pub use key_source::*;
pub use keys::*;
pub use material::*;
pub use responses::*;
pub use signer::*;
