use std::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn send_subscriptions() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_send_subscriptions"));
    command
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_clear()
        .env("APP_ENVIRONMENT", "production");
    command
}

#[test]
fn exits_with_1_when_secrets_are_missing() {
    // production.yaml carries no secrets
    let status = send_subscriptions()
        .status()
        .expect("Failed to run send_subscriptions.");

    assert_eq!(status.code(), Some(1));
}

#[test]
fn exits_with_1_for_an_unknown_environment() {
    let status = send_subscriptions()
        .env("APP_ENVIRONMENT", "staging")
        .status()
        .expect("Failed to run send_subscriptions.");

    assert_eq!(status.code(), Some(1));
}

#[tokio::test]
async fn runs_with_only_store_and_transport_secrets() {
    let github_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/wally/blog/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1..)
        .mount(&github_server)
        .await;

    let mut command = send_subscriptions();
    command
        .env("APP_GITHUB__API_BASE_URL", github_server.uri())
        .env("APP_GITHUB__TOKEN", "gh-token")
        .env("APP_EMAIL_CLIENT__USERNAME", "blog")
        .env("APP_EMAIL_CLIENT__PASSWORD", "smtp-password");

    let status = tokio::task::spawn_blocking(move || command.status())
        .await
        .unwrap()
        .expect("Failed to run send_subscriptions.");

    assert_eq!(status.code(), Some(0));
}
