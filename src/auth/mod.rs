//! Session cookie signing and admin key gating.

pub mod admin;
pub mod session;

pub use admin::secrets_match;
pub use session::{sign, verify, SessionTokenError};
