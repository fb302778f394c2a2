use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;

use crate::domain::new_subscription::{InvalidSubscription, NewSubscription, NewSubscriptionBody};
use crate::domain::subscription_status::SubscriptionStatus;
use crate::error_chain_fmt;
use crate::issue_store::{IssueQuery, IssueStoreError, NewIssue, RecordStore};
use crate::startup::IssueScope;

#[tracing::instrument(
    name = "Creating a new subscription handler",
    skip(body, store, scope),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriptionBody>,
    store: web::Data<dyn RecordStore>,
    scope: web::Data<IssueScope>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscription: NewSubscription = body.try_into()?;

    tracing::Span::current().record(
        "subscriber_email",
        tracing::field::display(&new_subscription.email),
    );

    if has_open_request(store.get_ref(), &scope, &new_subscription).await? {
        return Err(SubscribeError::Duplicate);
    }

    create_subscription_issue(store.get_ref(), &new_subscription).await?;

    Ok(HttpResponse::Created()
        .json(serde_json::json!({ "message": "구독 요청이 정상적으로 접수되었습니다." })))
}

#[tracing::instrument(name = "Looking for an open request with the same email", skip_all)]
async fn has_open_request(
    store: &dyn RecordStore,
    scope: &IssueScope,
    new_subscription: &NewSubscription,
) -> Result<bool, IssueStoreError> {
    let query = IssueQuery {
        labels: vec![],
        creator: scope.0.clone(),
    };
    let issues = store.list_issues(&query).await?;

    Ok(issues
        .iter()
        .any(|issue| issue.mentions(new_subscription.email.as_ref())))
}

#[tracing::instrument(name = "Recording the subscription as an issue", skip_all)]
async fn create_subscription_issue(
    store: &dyn RecordStore,
    new_subscription: &NewSubscription,
) -> Result<(), IssueStoreError> {
    let issue = store
        .create_issue(&NewIssue {
            title: new_subscription.issue_title(),
            body: new_subscription.issue_body(Utc::now()),
            labels: vec![SubscriptionStatus::Pending.as_ref().to_string()],
        })
        .await?;

    tracing::info!(issue = issue.number, "Subscription request recorded");
    Ok(())
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error(transparent)]
    Validation(#[from] InvalidSubscription),
    #[error("이미 동일 이메일로 등록된 요청이 있습니다.")]
    Duplicate,
    #[error("서버 처리 중 오류가 발생했습니다.")]
    Store(#[from] IssueStoreError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscribeError::Duplicate => StatusCode::CONFLICT,
            SubscribeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
