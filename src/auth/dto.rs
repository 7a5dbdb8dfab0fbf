use serde::{Deserialize, Serialize};

/// Form body posted by the Google sign-in button.
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    #[serde(rename = "CWRU_validated")]
    pub cwru_validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Why the credential was refused; absent when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
