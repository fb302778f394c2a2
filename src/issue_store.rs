//! Issue tracker used as the subscription record store.
//!
//! Business logic only talks to [`RecordStore`]; [`GitHubIssueStore`] is the production
//! implementation on top of the GitHub REST v3 issues API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time;

use crate::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const PER_PAGE: usize = 100;
const USER_AGENT: &str = "blog-subscriptions";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    // The issues endpoint also returns pull requests; they carry this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Filter for open issues.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    pub labels: Vec<String>,
    pub creator: Option<String>,
}

impl Issue {
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.name.as_str())
    }

    /// Case-insensitive substring search over title and body.
    pub fn mentions(&self, needle: &str) -> bool {
        format!("{}\n{}", self.title, self.body())
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

#[derive(thiserror::Error)]
pub enum IssueStoreError {
    #[error("Failed to reach the issue store.")]
    Request(#[from] reqwest::Error),
    #[error("The issue store answered {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl std::fmt::Debug for IssueStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open issues matching `query`.
    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueStoreError>;

    /// Comments of an issue in the order the store returns them.
    async fn list_comments(&self, issue_number: u64) -> Result<Vec<Comment>, IssueStoreError>;

    async fn post_comment(&self, issue_number: u64, body: &str)
        -> Result<Comment, IssueStoreError>;

    async fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, IssueStoreError>;
}

pub struct GitHubIssueStore {
    http_client: Client,
    base_url: String,
    repository: String,
    token: Secret<String>,
}

impl GitHubIssueStore {
    pub fn new(
        base_url: String,
        repository: String,
        token: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<GitHubIssueStore, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(GitHubIssueStore {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            repository,
            token,
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.base_url, self.repository)
    }

    fn comments_url(&self, issue_number: u64) -> String {
        format!("{}/{}/comments", self.issues_url(), issue_number)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(
                "Authorization",
                format!("token {}", self.token.expose_secret()),
            )
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// Follows `page=1, 2, ...` until a page comes back short.
    async fn get_all<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, IssueStoreError> {
        let mut results = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .authorized(self.http_client.get(url))
                .query(query)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?;
            let batch: Vec<T> = check_status(response).await?.json().await?;
            let is_last_page = batch.len() < PER_PAGE;

            results.extend(batch);
            if is_last_page {
                return Ok(results);
            }
            page += 1;
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IssueStoreError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IssueStoreError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RecordStore for GitHubIssueStore {
    #[tracing::instrument(name = "Listing open issues", skip(self))]
    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>, IssueStoreError> {
        let mut params = vec![("state", String::from("open"))];

        if !query.labels.is_empty() {
            params.push(("labels", query.labels.join(",")));
        }
        if let Some(creator) = &query.creator {
            params.push(("creator", creator.clone()));
        }

        let issues: Vec<Issue> = self.get_all(&self.issues_url(), &params).await?;

        Ok(issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .collect())
    }

    #[tracing::instrument(name = "Listing issue comments", skip(self))]
    async fn list_comments(&self, issue_number: u64) -> Result<Vec<Comment>, IssueStoreError> {
        self.get_all(&self.comments_url(issue_number), &[]).await
    }

    #[tracing::instrument(name = "Posting an issue comment", skip(self, body))]
    async fn post_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment, IssueStoreError> {
        let response = self
            .authorized(self.http_client.post(self.comments_url(issue_number)))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    #[tracing::instrument(
        name = "Creating an issue",
        skip(self, new_issue),
        fields(title = %new_issue.title)
    )]
    async fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, IssueStoreError> {
        let response = self
            .authorized(self.http_client.post(self.issues_url()))
            .json(new_issue)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}
