use chrono::{DateTime, SecondsFormat, Utc};
use unicode_segmentation::UnicodeSegmentation;

use crate::domain::subscription_items::SubscriptionItems;
use crate::issue_store::Comment;

/// Prefix of every successful dispatch comment. The resend-interval guard looks for it.
pub const DISPATCH_MARKER: &str = "📤";
pub const FAILURE_MARKER: &str = "⚠️";
const MAX_REASON_LENGTH: usize = 100;

pub const PARSE_FAILURE_COMMENT: &str = "⚠️ 발송 실패: 이메일을 분해할 수 없습니다. \
    (issue body에 '이메일: your@example.com' 형식으로 있어야 합니다.)";

/// Outcome of one send attempt, as recorded on the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchComment {
    Sent {
        at: DateTime<Utc>,
        items: String,
    },
    Failed {
        at: DateTime<Utc>,
        status: u16,
        reason: String,
    },
}

impl DispatchComment {
    pub fn sent(at: DateTime<Utc>, items: Option<&SubscriptionItems>) -> Self {
        DispatchComment::Sent {
            at,
            items: items.map(SubscriptionItems::joined).unwrap_or_default(),
        }
    }

    pub fn failed(at: DateTime<Utc>, status: u16, reason: &str) -> Self {
        DispatchComment::Failed {
            at,
            status,
            reason: reason.graphemes(true).take(MAX_REASON_LENGTH).collect(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            DispatchComment::Sent { at, items } => {
                format!("{} {} 발송 완료 — 항목: {}", DISPATCH_MARKER, iso8601(at), items)
            }
            DispatchComment::Failed { at, status, reason } => format!(
                "{} {} 발송 실패 — status: {}; resp: {}",
                FAILURE_MARKER,
                iso8601(at),
                status,
                reason
            ),
        }
    }
}

pub fn is_dispatch_marker(body: &str) -> bool {
    body.contains(DISPATCH_MARKER)
}

/// Creation time of the newest dispatch comment.
///
/// Compares timestamps instead of trusting the order the store returned the comments in.
pub fn latest_dispatch_at(comments: &[Comment]) -> Option<DateTime<Utc>> {
    comments
        .iter()
        .filter(|comment| comment.body.as_deref().is_some_and(is_dispatch_marker))
        .map(|comment| comment.created_at)
        .max()
}

fn iso8601(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
