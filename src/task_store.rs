use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use log::{info, warn};
use mongodb::bson::{doc, oid::ObjectId, to_document, Bson, Document};
use mongodb::Collection;
use serde_json::{Map, Value};

use crate::config::{CreatedAtPolicy, UpdatePolicy};
use crate::db::{self, MongoDB};
use crate::error::{ApiError, StoreError};
use crate::identifier::parse_record_id;
use crate::models::{NewTask, Task, TaskChanges, UpdateOutcome};

/// Storage primitives for task records. Each call is a single round-trip.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: NewTask) -> Result<ObjectId, StoreError>;
    async fn find_all(&self) -> Result<Vec<Task>, StoreError>;
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Task>, StoreError>;
    /// Applies `changes` to the record with `id`. With `upsert` a missing
    /// record is created under `id`.
    async fn update(&self, id: ObjectId, changes: &TaskChanges, upsert: bool) -> Result<UpdateOutcome, StoreError>;
    async fn delete(&self, id: ObjectId) -> Result<u64, StoreError>;
}

pub struct MongoTaskStore {
    collection: Collection<Document>,
}

impl MongoTaskStore {
    pub fn new(mongodb: &MongoDB) -> Self {
        Self { collection: mongodb.db.collection::<Document>(db::TASKS) }
    }
}

fn task_from_document(mut document: Document) -> Result<Task, StoreError> {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(id)) => id,
        other => return Err(StoreError::Malformed(format!("task _id is not an ObjectId: {:?}", other))),
    };
    let created_at = match document.remove("createdAt") {
        Some(Bson::DateTime(at)) => db::from_bson_datetime(at),
        _ => None,
    };
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Task { id, created_at, fields }),
        other => Err(StoreError::Malformed(format!("task {} decoded to {}", id, other))),
    }
}

/// Records that cannot be decoded are logged and left out of listings.
fn readable_task(document: Document) -> Option<Task> {
    match task_from_document(document) {
        Ok(task) => Some(task),
        Err(e) => {
            warn!("Skipping unreadable task record: {}", e);
            None
        }
    }
}

/// Builds the update for `changes`. Preserved timestamps are only written
/// for records created by an upsert.
fn update_document(changes: &TaskChanges, upsert: bool) -> Result<Document, StoreError> {
    let now = db::to_bson_datetime(changes.now);
    let mut set = to_document(&changes.fields)?;
    let mut update = Document::new();
    if changes.reset_created_at {
        set.insert("createdAt", now);
    } else if upsert {
        update.insert("$setOnInsert", doc! { "createdAt": now });
    }
    if !set.is_empty() {
        update.insert("$set", set);
    }
    Ok(update)
}

#[async_trait]
impl TaskStore for MongoTaskStore {
    async fn insert(&self, task: NewTask) -> Result<ObjectId, StoreError> {
        let mut document = to_document(&task.fields)?;
        document.insert("createdAt", db::to_bson_datetime(task.created_at));
        let result = self.collection.insert_one(document).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Malformed(format!("inserted id is not an ObjectId: {}", result.inserted_id)))
    }

    async fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut cursor = self.collection.find(doc! {}).await?;
        let mut tasks = Vec::new();
        while let Some(document) = cursor.next().await {
            if let Some(task) = readable_task(document?) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Task>, StoreError> {
        match self.collection.find_one(doc! { "_id": id }).await? {
            Some(document) => Ok(Some(task_from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: ObjectId, changes: &TaskChanges, upsert: bool) -> Result<UpdateOutcome, StoreError> {
        let update = update_document(changes, upsert)?;
        let result = self
            .collection
            .update_one(doc! { "_id": id }, update)
            .upsert(upsert)
            .await?;
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.and_then(|id| id.as_object_id()),
        })
    }

    async fn delete(&self, id: ObjectId) -> Result<u64, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count)
    }
}

/// Inserts a task from an arbitrary client payload and returns its new id.
pub async fn create(store: &dyn TaskStore, payload: Map<String, Value>) -> Result<ObjectId, ApiError> {
    let id = store.insert(NewTask::from_payload(payload, Utc::now())).await?;
    info!("Task created: {}", id);
    Ok(id)
}

pub async fn list(store: &dyn TaskStore) -> Result<Vec<Task>, ApiError> {
    Ok(store.find_all().await?)
}

pub async fn get_by_id(store: &dyn TaskStore, raw_id: &str) -> Result<Task, ApiError> {
    let id = parse_record_id(raw_id)?;
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn replace(
    store: &dyn TaskStore,
    raw_id: &str,
    payload: Map<String, Value>,
    update_policy: UpdatePolicy,
    created_at_policy: CreatedAtPolicy,
) -> Result<UpdateOutcome, ApiError> {
    let id = parse_record_id(raw_id)?;
    let changes = TaskChanges::from_payload(payload, Utc::now(), created_at_policy == CreatedAtPolicy::Reset);
    if changes.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".to_string()));
    }

    let outcome = store.update(id, &changes, update_policy == UpdatePolicy::Upsert).await?;
    if update_policy == UpdatePolicy::Strict && outcome.matched_count == 0 {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    match outcome.upserted_id {
        Some(upserted) => info!("Task {} created by update", upserted),
        None => info!("Task updated: {}", id),
    }
    Ok(outcome)
}

pub async fn delete(store: &dyn TaskStore, raw_id: &str) -> Result<u64, ApiError> {
    let id = parse_record_id(raw_id)?;
    let deleted = store.delete(id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    info!("Task deleted: {}", id);
    Ok(deleted)
}
