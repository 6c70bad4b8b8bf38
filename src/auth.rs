use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::{ok, Ready};
use log::info;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::LoginRequest;
use crate::session::{removal_cookie, session_cookie, Claims, SESSION_COOKIE};
use crate::user_directory;

/// Rejects requests without a valid session cookie. The decoded
/// [`Claims`] are stored in the request extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireSession;

impl<S, B> Transform<S, ServiceRequest> for RequireSession
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = RequireSessionMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequireSessionMiddleware { service })
    }
}

pub struct RequireSessionMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequireSessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verified = match (req.app_data::<web::Data<AppState>>(), req.cookie(SESSION_COOKIE)) {
            (Some(state), Some(cookie)) => state.session.verify(cookie.value()),
            _ => Err(ApiError::Unauthorized),
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_boxed_body())
                })
            }
            Err(err) => {
                let (req_parts, _payload) = req.into_parts();
                let srv_resp = ServiceResponse::new(req_parts, err.error_response());
                Box::pin(async move { Ok(srv_resp) })
            }
        }
    }
}

/// POST /login
/// Records the user on first login and sets the session cookie.
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let identity = payload.into_inner().into_identity()?;
    user_directory::find_or_create(data.users.as_ref(), &identity).await?;

    let token = data.session.issue(&identity)?;
    info!("Session issued for {}", identity.email);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, data.config.production))
        .json(json!({ "success": true })))
}

/// POST /logout
pub async fn logout(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(removal_cookie(data.config.production))
        .json(json!({ "success": true }))
}

/// Claims placed by [`RequireSession`]; absent means the route is not wrapped.
pub fn session_claims(req: &actix_web::HttpRequest) -> Result<Claims, ApiError> {
    req.extensions().get::<Claims>().cloned().ok_or(ApiError::Unauthorized)
}
