use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
pub const MIN_HUMAN_SCORE: f64 = 0.5;

/// Verdict returned by the reCAPTCHA `siteverify` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BotCheck {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl BotCheck {
    /// v2 responses carry no score; only the success flag matters for them.
    pub fn is_human(&self) -> bool {
        self.success && self.score.map_or(true, |score| score >= MIN_HUMAN_SCORE)
    }
}

pub struct RecaptchaClient {
    http_client: Client,
    verify_url: String,
    secret_key: Secret<String>,
}

impl RecaptchaClient {
    pub fn new(
        verify_url: String,
        secret_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<RecaptchaClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(RecaptchaClient {
            http_client,
            verify_url,
            secret_key,
        })
    }

    #[tracing::instrument(name = "Verifying a reCAPTCHA token", skip_all)]
    pub async fn verify(&self, token: &str) -> Result<BotCheck, reqwest::Error> {
        self.http_client
            .post(&self.verify_url)
            .form(&[
                ("secret", self.secret_key.expose_secret().as_str()),
                ("response", token),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
