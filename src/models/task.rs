use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{Map, Value};

/// A stored task. Only `_id` and `createdAt` are owned by the server; every
/// other field is whatever the client sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    #[serde(rename = "_id", serialize_with = "mongodb::bson::serde_helpers::serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A task about to be inserted.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    /// Drops the server-owned keys from a client payload.
    pub fn from_payload(mut fields: Map<String, Value>, created_at: DateTime<Utc>) -> Self {
        fields.remove("_id");
        fields.remove("createdAt");
        Self { fields, created_at }
    }
}

/// A resolved update: the fields to overwrite and how `createdAt` is treated.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub fields: Map<String, Value>,
    pub now: DateTime<Utc>,
    /// Overwrite `createdAt` with `now`. When false the stored value is kept
    /// and `now` is only used for records created by an upsert.
    pub reset_created_at: bool,
}

impl TaskChanges {
    /// Every client field except `_id` and `createdAt` overwrites the stored one.
    pub fn from_payload(mut fields: Map<String, Value>, now: DateTime<Utc>, reset_created_at: bool) -> Self {
        fields.remove("_id");
        fields.remove("createdAt");
        Self { fields, now, reset_created_at }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.reset_created_at
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<ObjectId>,
}

#[cfg(test)]
impl Task {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
