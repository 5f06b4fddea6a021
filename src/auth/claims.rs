use serde::{Deserialize, Serialize};

/// Claims read from an identity-provider access token.
/// `aud` is checked by the validator itself, so it is not modelled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,    // identity-provider subject
    pub iss: String,    // issuer
    pub exp: usize,     // expires at (unix timestamp)
}
