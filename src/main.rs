use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use jirawala::config::Config;
use jirawala::engine::Engine;
use jirawala::error::Error;
use jirawala::notify::{DynNotifier, LogNotifier, WebhookNotifier};
use jirawala::server::serve;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let notifier: DynNotifier = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };

    tracing::info!(policy = ?config.transition_policy, "starting booking service");

    let engine = Engine::new(pool, config.transition_policy, notifier).await?;

    serve(engine, &config).await
}
