use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use travel_listings::config::CorsConfig;
use travel_listings::{configure_app, telemetry, AppState, Settings};

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - same-origin only
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init("info,sqlx=warn");

    let config = Settings::new()?;
    info!("Configuration loaded ({} mode)", config.environment);

    let state = AppState::new(config.clone()).await?;
    let data = web::Data::new(state.clone());

    let listener = TcpListener::bind(config.server_address())?;
    info!("Starting server at http://{}", config.server_address());
    info!("API docs at http://{}/swagger/", config.server_address());

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(cors(&cors_config))
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_app)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await?;

    info!("Server stopped, closing connections");
    state.shutdown().await?;
    Ok(())
}
