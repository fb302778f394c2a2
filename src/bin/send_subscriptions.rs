//! Sends the subscription email to every approved subscriber that is due.
//!
//! Exit codes: 0 when the run completes, 1 when configuration is missing or invalid,
//! 2 when the run itself fails.

use std::process::ExitCode;

use blog_subscriptions::config::get_dispatch_configuration;
use blog_subscriptions::startup::dispatch_job;
use blog_subscriptions::telemetry::{get_subscriber, init_subscriber};

const CONFIGURATION_ERROR: u8 = 1;
const RUN_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = get_subscriber(
        String::from("send_subscriptions"),
        String::from("info"),
        std::io::stdout,
    );
    if let Err(err) = init_subscriber(subscriber) {
        eprintln!("Failed to initialise logging: {}", err);
    }

    let job = match get_dispatch_configuration() {
        Ok(config) => match dispatch_job(&config) {
            Ok(job) => job,
            Err(err) => {
                tracing::error!("Invalid configuration: {:?}", err);
                return ExitCode::from(CONFIGURATION_ERROR);
            }
        },
        Err(err) => {
            tracing::error!("Missing configuration: {}", err);
            return ExitCode::from(CONFIGURATION_ERROR);
        }
    };

    match job.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Dispatch run failed: {:?}", err);
            ExitCode::from(RUN_ERROR)
        }
    }
}
