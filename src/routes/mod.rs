mod health_check;
mod login;
mod session;
mod subscriptions;

pub use health_check::health_check;
pub use login::{handle_login, LoginError};
pub use session::handle_session;
pub use subscriptions::{handle_create_subscription, SubscribeError};

use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, HttpResponse};

/// Answers unparsable JSON bodies with the same `{error}` shape as the handlers.
pub fn json_error_handler(err: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    tracing::warn!("Rejected request body: {}", err);
    let response = HttpResponse::BadRequest()
        .json(serde_json::json!({ "error": "요청 본문이 올바른 JSON 형식이 아닙니다." }));

    actix_web::error::InternalError::from_response(err, response).into()
}
