use crate::config::Config;
use crate::connection::ws_index;
use crate::handlers::admin::configure_admin_handlers;
use actix_files::Files;
use actix_web::web;

mod admin;

pub fn root(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_index)));

    configure_admin_handlers(cfg);

    // Mounted last: it claims every remaining path under `/`.
    if config.static_dir.is_dir() {
        cfg.service(Files::new("/", &config.static_dir).index_file("index.html"));
    }
}
