use async_trait::async_trait;
use chrono::Utc;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

use crate::db::{self, MongoDB};
use crate::error::{ApiError, StoreError};
use crate::models::{Identity, User};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Writes `user` unless a record with the same email exists. Returns
    /// whether a record was written.
    async fn insert_if_absent(&self, user: &User) -> Result<bool, StoreError>;
}

pub struct MongoUserDirectory {
    collection: Collection<Document>,
}

impl MongoUserDirectory {
    pub fn new(mongodb: &MongoDB) -> Self {
        Self { collection: mongodb.db.collection::<Document>(db::USERS) }
    }
}

fn user_from_document(document: &Document) -> Result<User, StoreError> {
    let malformed = |err: mongodb::bson::document::ValueAccessError| StoreError::Malformed(format!("user record: {}", err));
    Ok(User {
        id: document.get_object_id("_id").map_err(malformed)?,
        uid: document.get_str("uid").map_err(malformed)?.to_string(),
        email: document.get_str("email").map_err(malformed)?.to_string(),
        display_name: document.get_str("displayName").map_err(malformed)?.to_string(),
        created_at: db::from_bson_datetime(*document.get_datetime("createdAt").map_err(malformed)?)
            .ok_or_else(|| StoreError::Malformed("user createdAt out of range".to_string()))?,
    })
}

/// Fields written only when the upsert creates the record. The email comes
/// from the filter.
fn on_insert_document(user: &User) -> Document {
    doc! {
        "_id": user.id,
        "uid": &user.uid,
        "displayName": &user.display_name,
        "createdAt": db::to_bson_datetime(user.created_at),
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self.collection.find_one(doc! { "email": email }).await? {
            Some(document) => Ok(Some(user_from_document(&document)?)),
            None => Ok(None),
        }
    }

    async fn insert_if_absent(&self, user: &User) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(doc! { "email": &user.email }, doc! { "$setOnInsert": on_insert_document(user) })
            .upsert(true)
            .await;
        match result {
            Ok(result) => Ok(result.upserted_id.is_some()),
            // A concurrent login won the race on the unique email index.
            Err(err) if db::is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// Returns the user for `identity.email`, creating it on first login.
pub async fn find_or_create(directory: &dyn UserDirectory, identity: &Identity) -> Result<User, ApiError> {
    if let Some(existing) = directory.find_by_email(&identity.email).await? {
        return Ok(existing);
    }

    let user = User::new(identity, Utc::now());
    if directory.insert_if_absent(&user).await? {
        info!("User created: {}", user.email);
        return Ok(user);
    }

    // The insert lost to an existing record, so the re-read must see it.
    directory.find_by_email(&identity.email).await?.ok_or_else(|| {
        ApiError::Storage(StoreError::Malformed(format!("user {} missing after conflicting insert", identity.email)))
    })
}

pub async fn get_by_email(directory: &dyn UserDirectory, email: &str) -> Result<User, ApiError> {
    directory
        .find_by_email(email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
