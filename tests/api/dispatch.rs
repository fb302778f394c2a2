use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use blog_subscriptions::dispatch::DispatchReport;
use blog_subscriptions::startup::dispatch_job;

use crate::helpers::{issue_json, TestApp};
use crate::mock_relay::MockRelay;

fn news_json() -> serde_json::Value {
    serde_json::json!({
        "date": "20240501",
        "sources": [{
            "title": { "original": "Rust 1.80 released", "ko": "Rust 1.80 출시" },
            "url": "https://blog.rust-lang.org/2024/07/25/Rust-1.80.0.html",
            "summary": { "original": "LazyLock is stable.", "ko": "LazyLock이 안정화되었습니다." }
        }]
    })
}

fn posted_comments(requests: &[wiremock::Request]) -> Vec<String> {
    requests
        .iter()
        .filter(|request| request.method == wiremock::http::Method::Post)
        .filter(|request| request.url.path().ends_with("/comments"))
        .map(|request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            body["body"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn subscription_is_dispatched_once_per_interval() {
    let test_app = TestApp::spawn_app().await;

    // Intake
    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .up_to_n_times(1)
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("POST"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(issue_json(
            1,
            "구독 신청 — a@b.com",
            "",
            "pending",
        )))
        .expect(1)
        .mount(&test_app.github_server)
        .await;

    let response = test_app
        .post_subscription(&serde_json::json!({ "email": "a@b.com", "items": ["it-news"] }))
        .await;
    assert_eq!(201, response.status().as_u16());

    let requests = test_app.github_server.received_requests().await.unwrap();
    let created: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let issue_body = created["body"].as_str().unwrap().to_string();
    assert!(issue_body.contains("이메일: a@b.com"));
    assert!(issue_body.contains("구독 항목: it-news"));
    assert_eq!(created["labels"], serde_json::json!(["pending"]));

    // The operator relabels the issue to `approved`
    test_app.github_server.verify().await;
    test_app.github_server.reset().await;
    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            issue_json(1, "구독 신청 — a@b.com", &issue_body, "approved")
        ])))
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("GET"))
        .and(path(test_app.comments_path(1)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("POST"))
        .and(path(test_app.comments_path(1)))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "body": "📤",
            "created_at": Utc::now()
        })))
        .expect(1)
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/generate-news"))
        .respond_with(ResponseTemplate::new(200).set_body_json(news_json()))
        .expect(1)
        .mount(&test_app.content_server)
        .await;

    let report = test_app.run_dispatch().await;

    assert_eq!(
        report,
        DispatchReport {
            sent: 1,
            skipped: 0,
            failed: 0
        }
    );

    let emails = test_app.email_server.received();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].recipients, vec![String::from("a@b.com")]);
    assert!(emails[0].data.contains("newsletter@wallylog.dev"));
    assert!(emails[0].data.contains("multipart/alternative"));

    let comments = posted_comments(&test_app.github_server.received_requests().await.unwrap());
    assert_eq!(comments.len(), 1);
    assert!(comments[0].starts_with("📤 "));
    assert!(comments[0].ends_with("발송 완료 — 항목: it-news"));

    // Second run inside the interval finds the marker and does nothing
    test_app.github_server.verify().await;
    test_app.github_server.reset().await;
    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            issue_json(1, "구독 신청 — a@b.com", &issue_body, "approved")
        ])))
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("GET"))
        .and(path(test_app.comments_path(1)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "body": comments[0], "created_at": Utc::now() }
        ])))
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test_app.github_server)
        .await;

    let report = test_app.run_dispatch().await;

    assert_eq!(
        report,
        DispatchReport {
            sent: 0,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(test_app.email_server.received().len(), 1);
}

#[tokio::test]
async fn unparsable_issue_and_rejected_email_are_commented() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            issue_json(1, "구독 신청", "이메일을 깜빡했어요", "approved"),
            issue_json(2, "구독 신청 — c@d.com", "- 이메일: c@d.com", "approved")
        ])))
        .mount(&test_app.github_server)
        .await;
    Mock::given(method("GET"))
        .and(path(test_app.comments_path(2)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&test_app.github_server)
        .await;
    for number in [1, 2] {
        Mock::given(method("POST"))
            .and(path(test_app.comments_path(number)))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "body": "comment",
                "created_at": Utc::now()
            })))
            .expect(1)
            .mount(&test_app.github_server)
            .await;
    }
    let relay = MockRelay::rejecting("550 5.7.1 relaying denied").await;
    let mut config = test_app.dispatch_config();
    config.email_client.host = relay.host();
    config.email_client.port = relay.port();

    let report = dispatch_job(&config).unwrap().run().await.unwrap();

    assert_eq!(
        report,
        DispatchReport {
            sent: 0,
            skipped: 1,
            failed: 1
        }
    );
    let comments = posted_comments(&test_app.github_server.received_requests().await.unwrap());
    assert_eq!(comments.len(), 2);
    assert!(comments[0].contains("이메일: your@example.com"));
    assert!(comments[1].starts_with("⚠️ "));
    assert!(comments[1].contains("status: 550; resp: "));
    assert!(relay.received().is_empty());
}

#[tokio::test]
async fn listing_failure_fails_the_run() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(method("GET"))
        .and(path(test_app.issues_path()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.github_server)
        .await;

    let job = dispatch_job(&test_app.dispatch_config()).unwrap();

    assert!(job.run().await.is_err());
}
