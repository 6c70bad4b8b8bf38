use actix_web::{web, HttpResponse};
use serde_json::{json, Map, Value};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::task_store;

/// POST /tasks
pub async fn create_task(
    data: web::Data<AppState>,
    payload: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, ApiError> {
    let id = task_store::create(data.tasks.as_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "acknowledged": true,
        "insertedId": id.to_hex(),
    })))
}

/// GET /tasks
pub async fn list_tasks(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tasks = task_store::list(data.tasks.as_ref()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /tasks/{id}
pub async fn get_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = task_store::get_by_id(data.tasks.as_ref(), &task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// PUT /tasks/{id}
pub async fn update_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, ApiError> {
    let outcome = task_store::replace(
        data.tasks.as_ref(),
        &task_id,
        payload.into_inner(),
        data.config.update_policy,
        data.config.created_at_policy,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task updated successfully",
        "matchedCount": outcome.matched_count,
        "modifiedCount": outcome.modified_count,
        "upsertedId": outcome.upserted_id.map(|id| id.to_hex()),
    })))
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let deleted = task_store::delete(data.tasks.as_ref(), &task_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully",
        "deletedCount": deleted,
    })))
}
