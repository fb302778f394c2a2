//! Subscriber metadata stored in an issue body.
//!
//! Format version 1. The body is read line by line; a field line looks like
//!
//! ```text
//! field-line = [ ("-" | "*") ws ] key ":" value
//! ```
//!
//! Keys are compared case-insensitively after trimming, the first occurrence of a key wins,
//! and unknown keys or free-form lines are ignored, so the order of lines does not matter.
//!
//! | key        | required | value                                  |
//! |------------|----------|----------------------------------------|
//! | `이메일`    | yes      | subscriber address                     |
//! | `구독 항목` | no       | comma separated feed identifiers       |
//! | `템플릿`    | no       | legacy template name, default `simple` |

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_items::SubscriptionItems;

pub const EMAIL_KEY: &str = "이메일";
pub const ITEMS_KEY: &str = "구독 항목";
pub const TEMPLATE_KEY: &str = "템플릿";
pub const DEFAULT_TEMPLATE: &str = "simple";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueMetadata {
    pub email: SubscriberEmail,
    pub items: Option<SubscriptionItems>,
    /// Only older issues carry it; every dispatch uses the same template now.
    pub template: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IssueBodyError {
    #[error("the issue body has no `이메일` line")]
    MissingEmail,
    #[error("the issue body has an invalid email: {0}")]
    InvalidEmail(String),
}

impl IssueMetadata {
    pub fn parse(body: &str) -> Result<IssueMetadata, IssueBodyError> {
        let email = field(body, EMAIL_KEY).ok_or(IssueBodyError::MissingEmail)?;
        let email =
            SubscriberEmail::parse(email.to_string()).map_err(IssueBodyError::InvalidEmail)?;
        let items = field(body, ITEMS_KEY).and_then(|items| SubscriptionItems::from_csv(items).ok());
        let template = field(body, TEMPLATE_KEY)
            .unwrap_or(DEFAULT_TEMPLATE)
            .to_string();

        Ok(IssueMetadata {
            email,
            items,
            template,
        })
    }
}

/// Value of the first non-empty `key: value` line.
fn field<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.lines()
        .filter_map(split_field_line)
        .find(|(line_key, value)| line_key.eq_ignore_ascii_case(key) && !value.is_empty())
        .map(|(_, value)| value)
}

fn split_field_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let line = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .unwrap_or(line);
    let (key, value) = line.split_once(':')?;

    Some((key.trim(), value.trim()))
}
