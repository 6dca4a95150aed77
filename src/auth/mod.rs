//! Authentication Module
//!
//! Password hashing, access-token issuing and the bearer-token guard that
//! resolves the principal of every protected request.

pub mod guard;
pub mod password;
pub mod token;

pub use guard::{authenticate, CurrentUser};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenKeys};
