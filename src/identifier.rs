use mongodb::bson::oid::ObjectId;

use crate::error::ApiError;

/// Parses a client-supplied record id (24 hex characters). A malformed id is
/// a client error and never reaches storage.
pub fn parse_record_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::InvalidInput("Invalid ID format".to_string()))
}
