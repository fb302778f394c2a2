use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::session::{verify_session_token, SESSION_COOKIE};
use crate::startup::SessionKeys;

/// Tells the authoring UI whether its `auth-token` cookie is still good.
#[tracing::instrument(name = "Session check handler", skip_all)]
pub async fn handle_session(request: HttpRequest, keys: web::Data<SessionKeys>) -> HttpResponse {
    let Some(cookie) = request.cookie(SESSION_COOKIE) else {
        return unauthorized();
    };

    match verify_session_token(cookie.value(), &keys.jwt_secret) {
        Ok(claims) => HttpResponse::Ok()
            .json(serde_json::json!({ "authenticated": true, "subject": claims.sub })),
        Err(err) => {
            tracing::info!("Rejected session cookie: {}", err);
            unauthorized()
        }
    }
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({ "error": "인증이 필요합니다." }))
}
