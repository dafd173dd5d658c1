use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::io;
use tracing_subscriber::EnvFilter;

use vinci_vantage::routes;
use vinci_vantage::settings::Settings;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().map_err(io::Error::other)?;
    let app_state = web::Data::new(vinci_vantage::init_state(&settings).map_err(io::Error::other)?);
    let uploads_dir = app_state.images.dir().to_path_buf();

    tracing::info!(
        host = %settings.server.host,
        port = settings.server.port,
        database = %settings.database.url,
        messaging = ?settings.messaging.mode,
        "starting HTTP server"
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(Files::new("/uploads", uploads_dir.clone()))
            .configure(routes::configure)
    })
    .bind((settings.server.host.as_str(), settings.server.port))?
    .run()
    .await
}
