use serde::{Deserialize, Serialize};

/// Session credential payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // identity-provider subject id
    pub uid: i64,     // internal user id
    pub name: String, // display name at issue time
    pub iat: usize,   // issued at (unix timestamp)
    pub exp: usize,   // expires at (unix timestamp)
    pub iss: String,  // issuer
    pub aud: String,  // audience
}
