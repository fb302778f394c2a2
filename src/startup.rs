use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use secrecy::Secret;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::auth::bot_check::RecaptchaClient;
use crate::auth::login_attempts::LoginAttemptLedger;
use crate::config::{DispatchJobSettings, EmailClientSettings, GitHubSettings, Settings};
use crate::content_client::ContentClient;
use crate::dispatch::DispatchJob;
use crate::email_client::{EmailClient, EmailClientError};
use crate::error_chain_fmt;
use crate::issue_store::{GitHubIssueStore, RecordStore};
use crate::routes::{
    handle_create_subscription, handle_login, handle_session, health_check, json_error_handler,
};

pub struct Application {
    pub port: u16,
    pub server: Server,
}

/// Account the intake duplicate check is scoped to.
pub struct IssueScope(pub Option<String>);

pub struct SessionKeys {
    pub jwt_secret: Secret<String>,
    pub password_hash: Secret<String>,
    pub secure_cookies: bool,
}

#[derive(thiserror::Error)]
pub enum StartupError {
    #[error("Failed to bind the address.")]
    Bind(#[from] std::io::Error),
    #[error("Failed to build an HTTP client.")]
    HttpClient(#[from] reqwest::Error),
    #[error("Sender email is not valid: {0}")]
    InvalidSender(String),
    #[error("Failed to set up the email client.")]
    EmailClient(#[from] EmailClientError),
}

impl std::fmt::Debug for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, StartupError> {
        let store: Arc<dyn RecordStore> = Arc::new(github_issue_store(&config.github)?);
        let recaptcha = RecaptchaClient::new(
            config.auth.recaptcha.verify_url.clone(),
            config.auth.recaptcha.secret_key.clone(),
            None,
        )?;
        let ledger = LoginAttemptLedger::new(
            config.auth.max_login_attempts,
            config.auth.lockout_window(),
        );
        let session_keys = SessionKeys {
            jwt_secret: config.auth.jwt_secret.clone(),
            password_hash: config.auth.password_hash.clone(),
            secure_cookies: config.application.secure_cookies,
        };

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();

        tracing::info!("Server listening on {}:{}", config.application.host, port);

        let server = run(
            listener,
            store,
            IssueScope(config.github.creator.clone()),
            ledger,
            recaptcha,
            session_keys,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn RecordStore>,
    scope: IssueScope,
    ledger: LoginAttemptLedger,
    recaptcha: RecaptchaClient,
    session_keys: SessionKeys,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn RecordStore> = web::Data::from(store);
    let scope = web::Data::new(scope);
    // One ledger for all workers
    let ledger = web::Data::new(ledger);
    let recaptcha = web::Data::new(recaptcha);
    let session_keys = web::Data::new(session_keys);

    let server = HttpServer::new(move || {
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route("/auth/login", web::post().to(handle_login))
            .route("/auth/session", web::get().to(handle_session))
            .app_data(store.clone())
            .app_data(scope.clone())
            .app_data(ledger.clone())
            .app_data(recaptcha.clone())
            .app_data(session_keys.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn github_issue_store(config: &GitHubSettings) -> Result<GitHubIssueStore, reqwest::Error> {
    GitHubIssueStore::new(
        config.api_base_url.clone(),
        config.repository.clone(),
        config.token.clone(),
        Some(config.timeout()),
    )
}

pub fn email_client(config: &EmailClientSettings) -> Result<EmailClient, StartupError> {
    let sender = config
        .get_sender_email()
        .map_err(StartupError::InvalidSender)?;

    Ok(EmailClient::new(
        &config.host,
        config.port,
        config.username.clone(),
        config.password.clone(),
        sender,
        config.sender_name.clone(),
        Some(config.timeout()),
    )?)
}

/// Everything one run of the dispatcher talks to.
pub fn dispatch_job(config: &DispatchJobSettings) -> Result<DispatchJob, StartupError> {
    let store: Arc<dyn RecordStore> = Arc::new(github_issue_store(&config.github)?);
    let content_client = ContentClient::new(
        config.content_api.base_url.clone(),
        Some(config.content_api.timeout()),
    )?;

    Ok(DispatchJob::new(
        store,
        email_client(&config.email_client)?,
        content_client,
        config.dispatch.send_interval(),
        config.github.creator.clone(),
    ))
}
