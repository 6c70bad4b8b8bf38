use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;

use crate::app_state::AppState;
use crate::auth::session_claims;
use crate::error::ApiError;
use crate::user_directory;

/// GET /user/{email}
/// Requires a session; any signed-in caller may look up any email.
pub async fn get_user_by_email(
    req: HttpRequest,
    data: web::Data<AppState>,
    email: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let claims = session_claims(&req)?;
    debug!("{} looked up user {}", claims.email, email);

    let user = user_directory::get_by_email(data.users.as_ref(), &email).await?;
    Ok(HttpResponse::Ok().json(user))
}
