use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A user record, created on the first login for an email and never changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "_id", serialize_with = "mongodb::bson::serde_helpers::serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    pub uid: String,
    pub email: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /login`. Every field is optional at the wire level so a
/// missing field is reported as invalid user data rather than a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub uid: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// The validated identity carried by a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

impl LoginRequest {
    pub fn into_identity(self) -> Result<Identity, ApiError> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        match (present(self.uid), present(self.email), present(self.display_name)) {
            (Some(uid), Some(email), Some(display_name)) => Ok(Identity { uid, email, display_name }),
            _ => Err(ApiError::InvalidInput("Invalid user data".to_string())),
        }
    }
}

impl User {
    pub fn new(identity: &Identity, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
            created_at,
        }
    }
}
