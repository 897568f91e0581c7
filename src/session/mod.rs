//! Session management.
//!
//! Restores a saved login when possible and otherwise walks the user through
//! phone, code and (if enabled) two-factor password sign-in.

mod authorize;

pub use authorize::{Account, AuthError, LoginApi, SignInStep, authorize};
