use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, OWNER_PASSWORD};

fn login_body(password: &str) -> serde_json::Value {
    serde_json::json!({ "password": password, "token": "recaptcha-token" })
}

fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("auth-token="))
        .map(String::from)
}

#[tokio::test]
async fn login_sets_a_session_cookie_for_the_right_password() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_human_recaptcha().await;

    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
        .await;

    assert_eq!(200, response.status().as_u16());
    let cookie = session_cookie(&response).expect("No session cookie was set.");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("Secure"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "로그인 성공");
}

#[tokio::test]
async fn session_cookie_from_login_is_accepted_by_the_session_check() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_human_recaptcha().await;

    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
        .await;
    let cookie = session_cookie(&response).unwrap();
    let cookie_pair = cookie.split(';').next().unwrap();

    let response = test_app.get_session(Some(cookie_pair)).await;

    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["subject"], "owner");
}

#[tokio::test]
async fn session_check_rejects_missing_or_forged_cookies() {
    let test_app = TestApp::spawn_app().await;

    let cases = vec![
        (None, "no cookie"),
        (Some("auth-token=forged.token.value"), "forged cookie"),
    ];

    for (cookie, description) in cases {
        let response = test_app.get_session(cookie).await;

        assert_eq!(401, response.status().as_u16(), "{}", description);
    }
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_human_recaptcha().await;

    let response = test_app
        .post_login(&login_body("hunter2"), "203.0.113.1")
        .await;

    assert_eq!(401, response.status().as_u16());
    assert!(session_cookie(&response).is_none());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "잘못된 비밀번호입니다.");
}

#[tokio::test]
async fn low_bot_score_returns_401_and_is_not_counted() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/recaptcha/api/siteverify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true, "score": 0.1 })),
        )
        .up_to_n_times(6)
        .mount(&test_app.recaptcha_server)
        .await;

    for _ in 0..6 {
        let response = test_app
            .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
            .await;

        assert_eq!(401, response.status().as_u16());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "reCAPTCHA 검증에 실패했습니다");
    }

    test_app.mount_human_recaptcha().await;
    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn sixth_attempt_within_the_window_is_locked_out_before_any_check() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .and(path("/recaptcha/api/siteverify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true, "score": 0.9 })),
        )
        .expect(5)
        .mount(&test_app.recaptcha_server)
        .await;

    for _ in 0..5 {
        let response = test_app
            .post_login(&login_body("hunter2"), "203.0.113.1")
            .await;
        assert_eq!(401, response.status().as_u16());
    }

    // Even the right password is refused while locked
    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
        .await;

    assert_eq!(429, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "너무 많은 로그인 시도가 있었습니다. 15분 후 다시 시도해주세요."
    );
}

#[tokio::test]
async fn lockout_is_per_client_ip() {
    let test_app = TestApp::spawn_app().await;
    test_app.mount_human_recaptcha().await;

    for _ in 0..5 {
        test_app
            .post_login(&login_body("hunter2"), "203.0.113.1")
            .await;
    }

    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "198.51.100.2")
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn unreachable_bot_check_returns_a_generic_500() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&test_app.recaptcha_server)
        .await;

    let response = test_app
        .post_login(&login_body(OWNER_PASSWORD), "203.0.113.1")
        .await;

    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "로그인 중 오류가 발생했습니다.");
}
