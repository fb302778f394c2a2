use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use secrecy::Secret;
use serde::Deserialize;

use crate::auth::bot_check::RecaptchaClient;
use crate::auth::login_attempts::LoginAttemptLedger;
use crate::auth::password::{verify_password, PasswordError};
use crate::auth::session::{mint_session_token, session_cookie, session_lifetime, SessionError};
use crate::error_chain_fmt;
use crate::startup::SessionKeys;

/// Subject of every session. The blog has a single owner account.
pub const OWNER_SUBJECT: &str = "owner";

#[derive(Deserialize)]
pub struct LoginBody {
    pub password: Secret<String>,
    #[serde(default)]
    pub token: String,
}

#[tracing::instrument(
    name = "Login handler",
    skip_all,
    fields(client_ip = tracing::field::Empty)
)]
pub async fn handle_login(
    request: HttpRequest,
    body: web::Json<LoginBody>,
    ledger: web::Data<LoginAttemptLedger>,
    recaptcha: web::Data<RecaptchaClient>,
    keys: web::Data<SessionKeys>,
) -> Result<HttpResponse, LoginError> {
    let client_ip = client_ip(&request);
    tracing::Span::current().record("client_ip", client_ip.as_str());

    if !ledger.check(&client_ip) {
        return Err(LoginError::TooManyAttempts {
            minutes: ledger.window().num_minutes(),
        });
    }

    let bot_check = recaptcha
        .verify(&body.token)
        .await
        .map_err(LoginError::BotCheckUnavailable)?;
    if !bot_check.is_human() {
        tracing::warn!(score = ?bot_check.score, errors = ?bot_check.error_codes, "Bot check failed");
        return Err(LoginError::BotCheckFailed);
    }

    let matches = verify_password(&body.password, &keys.password_hash)?;
    ledger.record(&client_ip, matches);
    if !matches {
        return Err(LoginError::WrongPassword);
    }

    let token = mint_session_token(OWNER_SUBJECT, &keys.jwt_secret, session_lifetime())?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, keys.secure_cookies))
        .json(serde_json::json!({ "success": true, "message": "로그인 성공" })))
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
fn client_ip(request: &HttpRequest) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip").map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| request.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| String::from("unknown"))
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("너무 많은 로그인 시도가 있었습니다. {minutes}분 후 다시 시도해주세요.")]
    TooManyAttempts { minutes: i64 },
    #[error("reCAPTCHA 검증에 실패했습니다")]
    BotCheckFailed,
    #[error("잘못된 비밀번호입니다.")]
    WrongPassword,
    #[error("로그인 중 오류가 발생했습니다.")]
    BotCheckUnavailable(#[source] reqwest::Error),
    #[error("로그인 중 오류가 발생했습니다.")]
    Password(#[from] PasswordError),
    #[error("로그인 중 오류가 발생했습니다.")]
    Session(#[from] SessionError),
}

impl std::fmt::Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
            LoginError::BotCheckFailed | LoginError::WrongPassword => StatusCode::UNAUTHORIZED,
            LoginError::BotCheckUnavailable(_)
            | LoginError::Password(_)
            | LoginError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
