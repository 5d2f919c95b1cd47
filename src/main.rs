mod app;
mod cache;
mod config;
mod error;
mod generator;
mod llm;
mod parser;
mod planner;
mod prompts;
mod state;
mod storage;
mod telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let debug = std::env::var("APP_DEBUG")
        .map(|v| config::parse_flag(&v).unwrap_or(false))
        .unwrap_or(false);
    let default_filter = if debug {
        "mealplanner=debug,tower_http=debug"
    } else {
        "mealplanner=info,tower_http=info"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    tracing::info!(
        service = %state.config.app_name,
        debug = state.config.debug,
        cache = state.cache.is_enabled(),
        "starting"
    );

    app::serve(app::build_app(state)).await
}
