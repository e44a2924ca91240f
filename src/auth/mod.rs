//! Authentication module
//!
//! Bearer-token authentication: tokens are minted at registration,
//! stored hashed, and resolved per-request by extractors.

mod middleware;
mod token;

pub use middleware::CurrentUser;
pub use token::mint_access_token;
