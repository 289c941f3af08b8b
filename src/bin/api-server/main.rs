use actix_cors::Cors;
use actix_web::{
    middleware::{Logger, NormalizePath},
    web, App, HttpServer,
};
use foodie_finds::{api, config::ApiConfig, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env()?;

    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_ansi(true)
        .with_file(false)
        .pretty()
        .try_init()
        .map_err(|e| anyhow::anyhow!("fail to setup logging: {e}"))?;

    let db_pool = db::connect(&config.database_url, config.max_connections).await?;
    let state = web::Data::new(api::ApiState::new(db_pool));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.host.as_str(), config.port))?;

    tracing::info!(
        "FoodieFinds API listening at http://{}:{}",
        config.host,
        config.port
    );
    server.run().await?;
    Ok(())
}
