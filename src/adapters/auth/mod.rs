//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `pubkey_validator` - RS256 tokens checked against the identity service's published key
//! - `mock` - Token table for tests, and the debug validator for local runs

mod mock;
mod pubkey_validator;

pub use mock::{DebugSessionValidator, MockSessionValidator};
pub use pubkey_validator::{PublicKeyConfig, PublicKeyValidator};
