use tokio::sync::mpsc::{channel, Sender};

use whiteboard_system::{
    ClientMessage, ConnectionId, Draw, PageChange, PageChanged, RoomId, ServerMessage, WhitePage,
};

use crate::admin::AdminCommand;
use crate::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::registry::RoomRegistry;

pub type ServerTx = Sender<ServerCommand>;

#[derive(Debug)]
pub enum ServerCommand {
    Connection(ConnectionCommand),
    Admin(AdminCommand),
}

/// Owns room membership and the outbound queue of every connection.
///
/// Each command is handled to completion before the next one; nothing in
/// here awaits.
pub struct Server {
    registry: RoomRegistry,
    connections: ConnectionTxStorage,
}

impl Server {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    pub fn handle_command(&mut self, command: ServerCommand) {
        match command {
            ServerCommand::Connection(command) => self.handle_connection_command(command),
            ServerCommand::Admin(command) => self.handle_admin_command(command),
        }
    }

    fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { tx } => {
                let connection_id = self.registry.create_connection();
                self.connections.insert(connection_id, tx);
                log::info!("Connection {} connected", connection_id);
                self.connections
                    .send(&connection_id, ConnectionEvent::Connected { connection_id });
            }
            ConnectionCommand::Disconnect { from } => {
                self.registry.disconnect(&from);
                if self.connections.remove(&from).is_some() {
                    log::info!("Connection {} disconnected", from);
                }
            }
            ConnectionCommand::ClientMessage { from, message } => {
                self.handle_client_message(&from, message)
            }
        }
    }

    fn handle_client_message(&mut self, from: &ConnectionId, message: ClientMessage) {
        log::debug!("Ingress from {}: {:?}", from, message);
        match message {
            ClientMessage::JoinRoom(room_id) => {
                self.registry.join_room(from, &room_id);
            }
            ClientMessage::Draw(draw) => self.relay_draw(from, draw),
            ClientMessage::Clear(room_id) => self.relay_clear(from, &room_id),
            ClientMessage::PageChange(page_change) => self.relay_page_change(from, page_change),
            ClientMessage::AddWhitePage(white_page) => self.relay_white_page(from, white_page),
        }
    }

    fn relay_draw(&self, from: &ConnectionId, draw: Draw) {
        self.broadcast_room_event(&draw.room_id, ServerMessage::Draw(draw.command), from);
    }

    // The sender need not be a member of `room_id`.
    fn relay_clear(&self, from: &ConnectionId, room_id: &RoomId) {
        self.broadcast_room_event(room_id, ServerMessage::Clear, from);
    }

    fn relay_page_change(&self, from: &ConnectionId, page_change: PageChange) {
        let event = ServerMessage::PageChange(PageChanged {
            page_num: page_change.page_num,
        });
        self.broadcast_room_event(&page_change.room_id, event, from);
    }

    fn relay_white_page(&self, from: &ConnectionId, white_page: WhitePage) {
        self.broadcast_room_event(
            &white_page.room_id,
            ServerMessage::AddWhitePage(white_page.page),
            from,
        );
    }

    fn broadcast_room_event(&self, room_id: &RoomId, event: ServerMessage, without: &ConnectionId) {
        let mut delivered = 0;
        for connection_id in self.registry.connection_ids_in_room(room_id) {
            if connection_id != without
                && self.connections.send(
                    connection_id,
                    ConnectionEvent::ServerMessage(event.clone()),
                )
            {
                delivered += 1;
            }
        }
        log::debug!("Relayed to {} connection(s) in room {}", delivered, room_id);
    }

    fn handle_admin_command(&self, command: AdminCommand) {
        match command {
            AdminCommand::ListRooms { tx } => {
                if tx.send(self.registry.summaries()).is_err() {
                    log::warn!("Admin requester went away before room list was ready");
                }
            }
        }
    }
}

pub fn spawn_server(buffer: usize) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ServerCommand>(buffer.max(1));

    tokio::spawn(async move {
        let mut server = Server::new();

        while let Some(command) = srv_rx.recv().await {
            server.handle_command(command);
        }
        log::info!("Server task terminated");
    });

    srv_tx
}
