use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use restaurant_menu::config::Settings;
use tracing_subscriber::EnvFilter;

mod api;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(true)
        .with_file(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("fail to setup logging: {e}"))?;

    let settings = Settings::from_env()?;
    let state = web::Data::new(api::ApiState::new(&settings).await?);
    let origin = settings.allowed_origin.clone();

    tracing::info!(host = %settings.host, port = settings.port, "starting api server");
    HttpServer::new(move || {
        let cors = match &origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("fail to bind {}:{}", settings.host, settings.port))?
    .run()
    .await?;
    Ok(())
}
