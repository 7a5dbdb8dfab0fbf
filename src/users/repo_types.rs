use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::patch::{nullable, required};

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub sub: String, // identity-provider subject id, immutable
    pub email: String,
    pub name: String,
    pub profile_picture: Option<String>,
    pub account_create_date: OffsetDateTime,
    pub gender: Option<String>,
    pub phone_number: Option<String>,
    pub is_admin: bool,
}

/// Fields a user may change on their own profile. Anything else in the
/// request body is ignored; `null` clears the optional fields.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default, deserialize_with = "required")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<String>>,
    #[serde(default, alias = "phone_number", deserialize_with = "nullable")]
    pub phone_number: Option<Option<String>>,
    #[serde(
        default,
        rename = "profilePhoto",
        alias = "profile_picture",
        deserialize_with = "nullable"
    )]
    pub profile_picture: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) if name.trim().is_empty() => Err("name must not be empty".into()),
            _ => Ok(()),
        }
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(gender) = &self.gender {
            user.gender = gender.clone();
        }
        if let Some(phone) = &self.phone_number {
            user.phone_number = phone.clone();
        }
        if let Some(picture) = &self.profile_picture {
            user.profile_picture = picture.clone();
        }
    }
}
