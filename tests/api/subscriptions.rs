use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{issue_json, TestApp};

async fn mount_open_issues(test_app: &TestApp, issues: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .and(query_param("state", "open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues))
        .expect(1)
        .mount(&test_app.github_server)
        .await;
}

#[tokio::test]
async fn subscribe_returns_201_and_records_a_pending_issue() {
    let test_app = TestApp::spawn_app().await;
    let email: String = SafeEmail().fake();

    mount_open_issues(&test_app, serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(issue_json(
            12,
            "구독 신청",
            "",
            "pending",
        )))
        .expect(1)
        .mount(&test_app.github_server)
        .await;

    let response = test_app
        .post_subscription(&serde_json::json!({
            "email": email,
            "items": ["english-pattern", "it-news"]
        }))
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "구독 요청이 정상적으로 접수되었습니다.");

    let requests = test_app.github_server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|request| request.method == wiremock::http::Method::Post)
        .unwrap();
    let issue: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(issue["title"], format!("구독 신청 — {}", email));
    assert_eq!(issue["labels"], serde_json::json!(["pending"]));
    let issue_body = issue["body"].as_str().unwrap();
    assert!(issue_body.contains(&format!("- 이메일: {}", email)));
    assert!(issue_body.contains("- 구독 항목: english-pattern, it-news"));
    assert!(issue_body.contains("- 라벨: pending"));
}

#[tokio::test]
async fn subscribe_returns_409_when_an_open_issue_mentions_the_email() {
    let test_app = TestApp::spawn_app().await;

    mount_open_issues(
        &test_app,
        serde_json::json!([issue_json(
            3,
            "구독 신청 — Someone@Example.com",
            "- 이메일: Someone@Example.com",
            "pending"
        )]),
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test_app.github_server)
        .await;

    let response = test_app
        .post_subscription(&serde_json::json!({
            "email": "someone@example.com",
            "items": ["it-news"]
        }))
        .await;

    assert_eq!(409, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "이미 동일 이메일로 등록된 요청이 있습니다.");
}

#[tokio::test]
async fn subscribe_returns_400_without_touching_the_store_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.github_server)
        .await;

    // table-driven: payload, expected error, description
    let test_cases = vec![
        (
            serde_json::json!({ "email": "not-an-email", "items": ["it-news"] }),
            "부적절한 이메일형식",
            "email without @",
        ),
        (
            serde_json::json!({ "email": "someone@example", "items": ["it-news"] }),
            "부적절한 이메일형식",
            "email without a dot after @",
        ),
        (
            serde_json::json!({ "email": "a@b.com\n- 구독 항목: x", "items": ["it-news"] }),
            "부적절한 이메일형식",
            "email carrying an extra record line",
        ),
        (
            serde_json::json!({ "items": ["it-news"] }),
            "부적절한 이메일형식",
            "missing email",
        ),
        (
            serde_json::json!({ "email": "someone@example.com", "items": [] }),
            "구독할 항목이 선택되지 않았습니다",
            "empty items",
        ),
        (
            serde_json::json!({ "email": "someone@example.com", "items": "it-news" }),
            "구독할 항목이 선택되지 않았습니다",
            "items is not a list",
        ),
        (
            serde_json::json!({ "email": "someone@example.com" }),
            "구독할 항목이 선택되지 않았습니다",
            "missing items",
        ),
    ];

    for (invalid_body, expected_error, description) in test_cases {
        let response = test_app.post_subscription(&invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload had {}",
            description
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], expected_error, "{}", description);
    }
}

#[tokio::test]
async fn subscribe_returns_400_for_malformed_json() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .post(format!("{}/subscriptions", test_app.address))
        .header("Content-Type", "application/json")
        .body("{ \"email\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn subscribe_returns_500_when_the_store_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(502))
        .mount(&test_app.github_server)
        .await;

    let response = test_app
        .post_subscription(&serde_json::json!({
            "email": "someone@example.com",
            "items": ["it-news"]
        }))
        .await;

    assert_eq!(500, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "서버 처리 중 오류가 발생했습니다.");
}
