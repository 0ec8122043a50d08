use anyhow::Context;
use clap::Parser;
use visual_keras::config::Config;
use visual_keras::http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::parse();
    log::info!("Starting server on {}", config.bind_addr);

    http::serve(config).await.context("server exited")
}
