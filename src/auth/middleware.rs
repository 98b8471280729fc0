use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
    web,
};

use crate::auth::session::get_user_id;
use crate::errors::ApiErrorResponse;
use crate::state::AppState;

/// Reject requests without a signed-in user: API paths get a 401 JSON body,
/// pages are redirected to /login. Demo requests pass as the demo user.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let demo = req
        .app_data::<web::Data<AppState>>()
        .is_some_and(|state| state.is_demo(req.request()));
    if !demo && get_user_id(&req.get_session()).is_none() {
        let response = if req.path().starts_with("/api/") {
            HttpResponse::Unauthorized().json(ApiErrorResponse {
                error: "Not authenticated".to_string(),
                details: None,
                variant: None,
            })
        } else {
            HttpResponse::SeeOther()
                .insert_header(("Location", "/login"))
                .finish()
        };
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// CSRF guard for the JSON API: mutations must be sent as
/// `application/json` (cross-site form posts cannot set it). The HTML
/// upload endpoint takes `multipart/form-data` instead.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method();
    if method == Method::POST || method == Method::PUT || method == Method::DELETE {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let expected = if req.path().ends_with("/upload/html") {
            "multipart/form-data"
        } else {
            "application/json"
        };
        if !content_type.starts_with(expected) {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse::destructive(format!(
                "Content-Type must be {expected} for this request"
            )));
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
