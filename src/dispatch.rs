//! One run of the subscription dispatcher.
//!
//! Approved issues are processed one after another. Whatever goes wrong with a single issue is
//! logged and tallied; only failing to list the issues aborts the run.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::content_client::{ContentClient, ContentError};
use crate::domain::dispatch_comment::{latest_dispatch_at, DispatchComment, PARSE_FAILURE_COMMENT};
use crate::domain::issue_body::IssueMetadata;
use crate::domain::subscription_items::{FeedItem, SubscriptionItems};
use crate::domain::subscription_status::SubscriptionStatus;
use crate::email_client::{EmailClient, SendOutcome};
use crate::error_chain_fmt;
use crate::issue_store::{Issue, IssueQuery, IssueStoreError, RecordStore};
use crate::render::{render_content, Supplements};

pub struct DispatchJob {
    store: Arc<dyn RecordStore>,
    email_client: EmailClient,
    content_client: ContentClient,
    send_interval: Duration,
    creator: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to list approved subscription issues.")]
    ListIssues(#[source] IssueStoreError),
}

impl std::fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
enum IssueError {
    #[error("Failed to talk to the issue store.")]
    Store(#[from] IssueStoreError),
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl std::fmt::Debug for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

enum IssueOutcome {
    Sent,
    Skipped,
    Failed,
}

impl DispatchJob {
    pub fn new(
        store: Arc<dyn RecordStore>,
        email_client: EmailClient,
        content_client: ContentClient,
        send_interval: Duration,
        creator: Option<String>,
    ) -> Self {
        Self {
            store,
            email_client,
            content_client,
            send_interval,
            creator,
        }
    }

    #[tracing::instrument(name = "Dispatching subscription emails", skip(self))]
    pub async fn run(&self) -> Result<DispatchReport, DispatchError> {
        let query = IssueQuery {
            labels: vec![SubscriptionStatus::Approved.as_ref().to_string()],
            creator: self.creator.clone(),
        };
        let issues = self
            .store
            .list_issues(&query)
            .await
            .map_err(DispatchError::ListIssues)?;

        tracing::info!("Found {} approved subscription issues", issues.len());

        let mut report = DispatchReport::default();
        // Generated content is the same for every subscriber, fetch it at most once per run.
        let mut supplements = Supplements::default();

        for issue in &issues {
            match self.process_issue(issue, &mut supplements).await {
                Ok(IssueOutcome::Sent) => report.sent += 1,
                Ok(IssueOutcome::Skipped) => report.skipped += 1,
                Ok(IssueOutcome::Failed) => report.failed += 1,
                Err(err) => {
                    tracing::error!(issue = issue.number, "Failed to process issue: {:?}", err);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            "Dispatch run finished"
        );

        Ok(report)
    }

    #[tracing::instrument(
        name = "Processing a subscription issue",
        skip(self, issue, supplements),
        fields(issue = issue.number)
    )]
    async fn process_issue(
        &self,
        issue: &Issue,
        supplements: &mut Supplements,
    ) -> Result<IssueOutcome, IssueError> {
        let approved = SubscriptionStatus::from_labels(issue.label_names())
            .is_some_and(|status| status.is_approved());
        if !approved {
            tracing::info!("Issue is not approved, skipping");
            return Ok(IssueOutcome::Skipped);
        }

        let metadata = match IssueMetadata::parse(issue.body()) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!("Issue body could not be parsed: {}", err);
                self.store
                    .post_comment(issue.number, PARSE_FAILURE_COMMENT)
                    .await?;
                return Ok(IssueOutcome::Skipped);
            }
        };

        let comments = self.store.list_comments(issue.number).await?;
        if let Some(last_dispatch) = latest_dispatch_at(&comments) {
            if !self.interval_elapsed(last_dispatch, Utc::now()) {
                tracing::info!(%last_dispatch, "Sent recently, skipping");
                return Ok(IssueOutcome::Skipped);
            }
        }

        self.load_supplements(metadata.items.as_ref(), supplements)
            .await?;
        let content = render_content(
            metadata.items.as_ref(),
            &supplements_for(metadata.items.as_ref(), supplements),
        );

        let comment = match self.email_client.send_email(&metadata.email, &content).await {
            SendOutcome::Delivered => DispatchComment::sent(Utc::now(), metadata.items.as_ref()),
            SendOutcome::Rejected { status, body } => {
                tracing::warn!(status, "Email was rejected");
                DispatchComment::failed(Utc::now(), status, &body)
            }
        };
        self.store
            .post_comment(issue.number, &comment.render())
            .await?;

        match comment {
            DispatchComment::Sent { .. } => Ok(IssueOutcome::Sent),
            DispatchComment::Failed { .. } => Ok(IssueOutcome::Failed),
        }
    }

    fn interval_elapsed(&self, last_dispatch: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_dispatch >= self.send_interval
    }

    async fn load_supplements(
        &self,
        items: Option<&SubscriptionItems>,
        supplements: &mut Supplements,
    ) -> Result<(), ContentError> {
        let Some(items) = items else {
            return Ok(());
        };

        if items.contains(FeedItem::EnglishPattern) && supplements.patterns.is_none() {
            supplements.patterns = Some(self.content_client.fetch_patterns().await?);
        }
        if items.contains(FeedItem::ItNews) && supplements.news.is_none() {
            supplements.news = Some(self.content_client.fetch_news().await?);
        }

        Ok(())
    }
}

/// The part of the cached content this subscriber asked for.
fn supplements_for(items: Option<&SubscriptionItems>, cached: &Supplements) -> Supplements {
    let wants = |feed: FeedItem| items.is_some_and(|items| items.contains(feed));

    Supplements {
        patterns: cached
            .patterns
            .clone()
            .filter(|_| wants(FeedItem::EnglishPattern)),
        news: cached.news.clone().filter(|_| wants(FeedItem::ItNews)),
    }
}
