use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub github: GitHubSettings,
    pub email_client: EmailClientSettings,
    pub content_api: ContentApiSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    pub auth: AuthSettings,
}

/// The subset the dispatch binary needs. Login and HTTP settings stay optional for it.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct DispatchJobSettings {
    pub github: GitHubSettings,
    pub email_client: EmailClientSettings,
    pub content_api: ContentApiSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Adds `Secure` to the session cookie. Off only for plain-http development.
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct GitHubSettings {
    #[serde(default = "default_github_api")]
    pub api_base_url: String,
    /// `owner/repo` holding the subscription issues.
    pub repository: String,
    pub token: Secret<String>,
    /// Account whose issues are considered. Everyone's when unset.
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(
        default = "default_timeout_milliseconds",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct EmailClientSettings {
    /// SMTP relay. Port 465 connects over TLS, any other port upgrades with STARTTLS.
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(
        default = "default_timeout_milliseconds",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ContentApiSettings {
    pub base_url: String,
    #[serde(
        default = "default_content_timeout_milliseconds",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DispatchSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub send_interval_hours: i64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub jwt_secret: Secret<String>,
    /// Argon2 PHC string of the blog owner's password.
    pub password_hash: Secret<String>,
    #[serde(
        default = "default_max_login_attempts",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub max_login_attempts: u32,
    #[serde(
        default = "default_lockout_window_minutes",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub lockout_window_minutes: i64,
    pub recaptcha: RecaptchaSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct RecaptchaSettings {
    #[serde(default = "default_recaptcha_verify_url")]
    pub verify_url: String,
    pub secret_key: Secret<String>,
}

fn default_github_api() -> String {
    String::from("https://api.github.com")
}

fn default_sender_name() -> String {
    String::from("WallyLog")
}

fn default_timeout_milliseconds() -> u64 {
    10_000
}

// Content is generated on demand and can take a while.
fn default_content_timeout_milliseconds() -> u64 {
    60_000
}

fn default_max_login_attempts() -> u32 {
    5
}

fn default_lockout_window_minutes() -> i64 {
    15
}

fn default_recaptcha_verify_url() -> String {
    String::from("https://www.google.com/recaptcha/api/siteverify")
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_interval_hours: 24,
        }
    }
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl From<Settings> for DispatchJobSettings {
    fn from(settings: Settings) -> Self {
        Self {
            github: settings.github,
            email_client: settings.email_client,
            content_api: settings.content_api,
            dispatch: settings.dispatch,
        }
    }
}

impl GitHubSettings {
    pub fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl EmailClientSettings {
    pub fn get_sender_email(&self) -> Result<SubscriberEmail, String> {
        SubscriberEmail::parse(self.sender_email.clone())
    }

    pub fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl ContentApiSettings {
    pub fn timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl DispatchSettings {
    pub fn send_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.send_interval_hours)
    }
}

impl AuthSettings {
    pub fn lockout_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lockout_window_minutes)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    load_configuration()
}

/// Loads only what one dispatch run needs.
pub fn get_dispatch_configuration() -> Result<DispatchJobSettings, ConfigError> {
    load_configuration()
}

fn load_configuration<T: serde::de::DeserializeOwned>() -> Result<T, ConfigError> {
    let root_path =
        std::env::current_dir().map_err(|err| ConfigError::Message(err.to_string()))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(environment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_GITHUB__TOKEN would set Settings.github.token
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", environment);

    // Try to convert the value from the configuration file into the requested settings type
    settings.try_deserialize()
}
