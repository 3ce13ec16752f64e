use std::time::Duration;

use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod sessions;
mod state;
mod telemetry;
#[cfg(test)]
mod testing;
mod todos;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    telemetry::init(config.json_logs)?;

    let db = AppState::connect(&config).await?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let app_state = AppState::from_pool(db, &config);

    if config.session.cleanup_interval_secs > 0 {
        app_state
            .sessions
            .spawn_cleanup(Duration::from_secs(config.session.cleanup_interval_secs));
    }

    app::serve(app::build_app(app_state), &config).await
}
