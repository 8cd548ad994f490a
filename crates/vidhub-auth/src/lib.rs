//! vidhub credential primitives.
//!
//! - `tokens`: stateless access/refresh bearer tokens (HS256 JWT).
//! - `keys`: signing key pairs and refresh-token fingerprints.
//! - `password`: Argon2id password hashing.
//!
//! Nothing in this crate touches storage. Persisting refresh sessions is the
//! job of the session store in `vidhub-db`.

pub mod keys;
pub mod password;
pub mod tokens;

pub use tokens::{Claims, IssuedToken, TokenConfig, TokenError, TokenKind, TokenService};
