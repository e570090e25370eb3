use crate::admin::{AdminCommand, RoomSummary};
use crate::server::{ServerCommand, ServerTx};
use actix_web::error;
use actix_web::web;
use actix_web::{HttpResponse, Responder, Result};

pub fn configure_admin_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(
            web::resource("/rooms")
                .name("admin_rooms")
                .route(web::get().to(list_rooms)),
        ),
    );
}

pub async fn list_rooms(srv_tx: web::Data<ServerTx>) -> Result<impl Responder> {
    let (tx, rx) = tokio::sync::oneshot::channel::<Vec<RoomSummary>>();

    srv_tx
        .send(ServerCommand::Admin(AdminCommand::ListRooms { tx }))
        .await
        .map_err(|_| error::ErrorServiceUnavailable("Server unavailable"))?;

    let rooms = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;
    Ok(HttpResponse::Ok().json(rooms))
}
