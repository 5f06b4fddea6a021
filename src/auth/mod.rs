mod claims;
pub(crate) mod extractors;
pub mod jwks;
pub mod repo;
pub mod services;

pub use extractors::CurrentUser;
pub use jwks::TokenVerifier;
