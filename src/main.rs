use blog_subscriptions::config::get_configuration;
use blog_subscriptions::startup::Application;
use blog_subscriptions::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("blog_subscriptions"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber).map_err(std::io::Error::other)?;

    let config = get_configuration().map_err(std::io::Error::other)?;
    let application = Application::build(config)
        .await
        .map_err(|err| std::io::Error::other(format!("{:?}", err)))?;

    application.run_until_stop().await
}
