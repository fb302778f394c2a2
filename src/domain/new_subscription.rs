use actix_web::web;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_items::SubscriptionItems;
use crate::domain::subscription_status::SubscriptionStatus;

#[derive(Debug)]
pub struct NewSubscription {
    pub email: SubscriberEmail,
    pub items: SubscriptionItems,
}

/// Raw intake payload. Both fields are optional so that a missing field is answered with the
/// same validation message as an invalid one.
#[derive(Deserialize)]
pub struct NewSubscriptionBody {
    pub email: Option<String>,
    pub items: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidSubscription {
    #[error("부적절한 이메일형식")]
    Email(String),
    #[error("구독할 항목이 선택되지 않았습니다")]
    Items(String),
}

impl TryFrom<web::Json<NewSubscriptionBody>> for NewSubscription {
    type Error = InvalidSubscription;

    fn try_from(body: web::Json<NewSubscriptionBody>) -> Result<Self, Self::Error> {
        let body = body.into_inner();
        let email = SubscriberEmail::parse(body.email.unwrap_or_default())
            .map_err(InvalidSubscription::Email)?;
        let items = match body.items {
            Some(serde_json::Value::Array(values)) => values
                .into_iter()
                .map(|value| match value {
                    serde_json::Value::String(item) => Ok(item),
                    other => Err(format!("{} is not a subscription item", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .and_then(SubscriptionItems::parse),
            _ => Err(String::from("items must be a list")),
        }
        .map_err(InvalidSubscription::Items)?;

        Ok(NewSubscription { email, items })
    }
}

impl NewSubscription {
    pub fn issue_title(&self) -> String {
        format!("구독 신청 — {}", self.email)
    }

    /// Issue body in the line-oriented format read back by `IssueMetadata::parse`.
    pub fn issue_body(&self, requested_at: DateTime<Utc>) -> String {
        format!(
            "### 새 구독 신청\n\n\
             - 이메일: {}\n\
             - 구독 항목: {}\n\
             - 라벨: {}\n\
             - 신청시각: {}\n\n\
             (자동 생성된 요청 — 관리자가 승인하면 라벨을 '{}'로 변경해 주세요. \
             발송 작업은 '{}' 라벨을 기준으로 발송합니다.)",
            self.email,
            self.items.joined(),
            SubscriptionStatus::Pending.as_ref(),
            requested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            SubscriptionStatus::Approved.as_ref(),
            SubscriptionStatus::Approved.as_ref(),
        )
    }
}
