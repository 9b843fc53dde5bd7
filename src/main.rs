use anyhow::Context;
use clap::Parser;

use student_insight::config::Config;
use student_insight::model::InferenceContext;
use student_insight::server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let model = if config.model_path.exists() {
        let context = InferenceContext::load(&config.model_path)
            .await
            .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
        Some(context)
    } else {
        log::error!("Model file not found at {}", config.model_path.display());
        None
    };

    server::run(&config, model)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
