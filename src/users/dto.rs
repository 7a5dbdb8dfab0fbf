use serde::Serialize;
use time::OffsetDateTime;

use crate::users::repo_types::User;

/// Profile returned to its owner (and to admins).
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub gender: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "accountCreateDate", with = "time::serde::rfc3339")]
    pub account_create_date: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            gender: u.gender,
            phone_number: u.phone_number,
            profile_picture: u.profile_picture,
            is_admin: u.is_admin,
            account_create_date: u.account_create_date,
        }
    }
}

/// What other signed-in users may see.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

impl From<User> for PublicProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            profile_picture: u.profile_picture,
        }
    }
}
