use actix_web::{middleware, web, App, HttpServer};

use whiteboard_server::config::Config;
use whiteboard_server::handlers;
use whiteboard_server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load();
    if !config.static_dir.is_dir() {
        log::warn!(
            "Static directory {} not found, serving WebSocket and admin routes only",
            config.static_dir.display()
        );
    }

    let srv_tx = spawn_server(config.server_buffer);
    let bind_addr = config.bind_addr();
    let config = web::Data::new(config);

    log::info!("Server running on {}", bind_addr);
    HttpServer::new(move || {
        let config = config.clone();
        App::new()
            .app_data(web::Data::new(srv_tx.clone()))
            .app_data(config.clone())
            .wrap(middleware::Logger::default())
            .configure(|cfg| handlers::root(cfg, &config))
    })
    .bind(bind_addr)?
    .run()
    .await
}
