use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};

use crate::auth::{login, logout, RequireSession};
use crate::error::ApiError;
use crate::tasks::{create_task, delete_task, get_task, list_tasks, update_task};
use crate::user_management::get_user_by_email;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout))
        .service(
            web::scope("/user")
                .wrap(RequireSession)
                .route("/{email}", web::get().to(get_user_by_email)),
        )
        .service(
            web::scope("/tasks")
                .route("", web::post().to(create_task))
                .route("", web::get().to(list_tasks))
                .route("/{id}", web::get().to(get_task))
                .route("/{id}", web::put().to(update_task))
                .route("/{id}", web::delete().to(delete_task)),
        );
}

/// Body parse failures become the usual `{message}` 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        ApiError::InvalidInput(format!("Invalid request body: {}", err)).into()
    })
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Task Management API is running!")
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound("Not found".to_string()))
}
