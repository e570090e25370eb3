use tokio::sync::mpsc::{channel, error::TryRecvError, Receiver};

use whiteboard_server::admin::AdminCommand;
use whiteboard_server::connection::{ConnectionCommand, ConnectionEvent};
use whiteboard_server::server::{spawn_server, Server, ServerCommand};
use whiteboard_system::serde_json::{json, Map};
use whiteboard_system::{
    ClientMessage, ConnectionId, Draw, DrawCommand, PageChange, PageChanged, PageNumber, RoomId,
    ServerMessage, StrokePoint, Tool, WhitePage,
};

struct Client {
    id: ConnectionId,
    rx: Receiver<ConnectionEvent>,
}

impl Client {
    fn connect(server: &mut Server) -> Self {
        let (tx, mut rx) = channel(64);
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Connect { tx }));
        match rx.try_recv() {
            Ok(ConnectionEvent::Connected { connection_id }) => Self {
                id: connection_id,
                rx,
            },
            other => panic!("expected Connected, got {:?}", other),
        }
    }

    fn send(&self, server: &mut Server, message: ClientMessage) {
        server.handle_command(ServerCommand::Connection(ConnectionCommand::ClientMessage {
            from: self.id,
            message,
        }));
    }

    fn join(&self, server: &mut Server, room: &str) {
        self.send(server, ClientMessage::JoinRoom(room_id(room)));
    }

    fn disconnect(&self, server: &mut Server) {
        server.handle_command(ServerCommand::Connection(ConnectionCommand::Disconnect {
            from: self.id,
        }));
    }

    fn received(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(ConnectionEvent::ServerMessage(message)) => messages.push(message),
                Ok(other) => panic!("unexpected event {:?}", other),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break messages,
            }
        }
    }
}

fn room_id(id: &str) -> RoomId {
    RoomId::new(id).expect("")
}

fn point(x: f64, y: f64) -> DrawCommand {
    DrawCommand::Stroke(StrokePoint {
        x,
        y,
        tool: Tool::Pen,
        color: "#000000".into(),
        size: 5.0,
    })
}

fn draw(room: &str, command: DrawCommand) -> ClientMessage {
    ClientMessage::Draw(Draw {
        room_id: room_id(room),
        command,
    })
}

#[test]
fn it_should_relay_draw_to_other_members_only() {
    let mut server = Server::new();
    let mut a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");

    a.send(&mut server, draw("r1", point(12.5, 40.0)));

    assert_eq!(b.received(), vec![ServerMessage::Draw(point(12.5, 40.0))]);
    assert!(a.received().is_empty());
}

#[test]
fn it_should_isolate_rooms() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    let mut c = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");
    c.join(&mut server, "r2");

    a.send(&mut server, draw("r1", point(1.0, 1.0)));
    a.send(&mut server, ClientMessage::Clear(room_id("r1")));

    assert_eq!(b.received().len(), 2);
    assert!(c.received().is_empty());
}

#[test]
fn it_should_let_late_joiner_exchange_events_in_created_room() {
    let mut server = Server::new();
    let mut a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "fresh-room");
    a.send(&mut server, draw("fresh-room", point(1.0, 1.0)));

    b.join(&mut server, "fresh-room");
    assert!(b.received().is_empty(), "no backfill for late joiners");

    b.send(&mut server, ClientMessage::Clear(room_id("fresh-room")));
    assert_eq!(a.received(), vec![ServerMessage::Clear]);
}

#[test]
fn it_should_preserve_stroke_order_and_pen_up() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");

    a.send(&mut server, draw("r1", point(1.0, 1.0)));
    a.send(&mut server, draw("r1", point(2.0, 2.0)));
    a.send(&mut server, draw("r1", DrawCommand::PenUp));

    let received = b.received();
    assert_eq!(
        received,
        vec![
            ServerMessage::Draw(point(1.0, 1.0)),
            ServerMessage::Draw(point(2.0, 2.0)),
            ServerMessage::Draw(DrawCommand::PenUp),
        ]
    );
    let pen_up = received[2].to_json().expect("");
    assert_eq!(pen_up, r#"{"event":"draw","data":{"isNewStroke":true}}"#);
}

#[test]
fn it_should_relay_page_change_without_room_id() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");

    a.send(
        &mut server,
        ClientMessage::PageChange(PageChange {
            room_id: room_id("r1"),
            page_num: PageNumber::new(5).expect(""),
        }),
    );

    let received = b.received();
    assert_eq!(
        received,
        vec![ServerMessage::PageChange(PageChanged {
            page_num: PageNumber::new(5).expect(""),
        })]
    );
    assert_eq!(
        received[0].to_json().expect(""),
        r#"{"event":"pageChange","data":{"pageNum":5}}"#
    );
}

#[test]
fn it_should_relay_white_page_payload() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");

    let mut page = Map::new();
    page.insert("afterPage".into(), json!(3));
    a.send(
        &mut server,
        ClientMessage::AddWhitePage(WhitePage {
            room_id: room_id("r1"),
            page: page.clone(),
        }),
    );

    assert_eq!(b.received(), vec![ServerMessage::AddWhitePage(page)]);
}

#[test]
fn it_should_relay_clear_into_room_sender_never_joined() {
    let mut server = Server::new();
    let outsider = Client::connect(&mut server);
    let mut member = Client::connect(&mut server);
    member.join(&mut server, "r1");

    outsider.send(&mut server, ClientMessage::Clear(room_id("r1")));
    outsider.send(&mut server, ClientMessage::Clear(room_id("nobody-here")));

    assert_eq!(member.received(), vec![ServerMessage::Clear]);
}

#[test]
fn it_should_keep_relaying_after_member_disconnects() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    let c = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");
    c.join(&mut server, "r1");

    c.disconnect(&mut server);
    c.disconnect(&mut server);
    a.send(&mut server, draw("r1", point(3.0, 4.0)));

    assert_eq!(b.received(), vec![ServerMessage::Draw(point(3.0, 4.0))]);
}

#[test]
fn it_should_keep_relaying_when_recipient_queue_is_gone() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let b = Client::connect(&mut server);
    let mut c = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");
    c.join(&mut server, "r1");

    // b's transport vanished without a disconnect reaching the server yet.
    drop(b);
    a.send(&mut server, draw("r1", point(5.0, 6.0)));

    assert_eq!(c.received(), vec![ServerMessage::Draw(point(5.0, 6.0))]);
}

#[test]
fn it_should_stop_relaying_previous_room_after_switching() {
    let mut server = Server::new();
    let a = Client::connect(&mut server);
    let mut b = Client::connect(&mut server);
    a.join(&mut server, "r1");
    b.join(&mut server, "r1");
    b.join(&mut server, "r2");

    a.send(&mut server, draw("r1", point(1.0, 1.0)));
    assert!(b.received().is_empty());

    a.join(&mut server, "r2");
    a.send(&mut server, ClientMessage::Clear(room_id("r2")));
    assert_eq!(b.received(), vec![ServerMessage::Clear]);
}

#[tokio::test]
async fn it_should_list_live_rooms_through_spawned_server() {
    let srv_tx = spawn_server(16);
    let (tx, mut rx) = channel(8);
    srv_tx
        .send(ServerCommand::Connection(ConnectionCommand::Connect { tx }))
        .await
        .expect("");
    let connection_id = match rx.recv().await {
        Some(ConnectionEvent::Connected { connection_id }) => connection_id,
        other => panic!("expected Connected, got {:?}", other),
    };
    srv_tx
        .send(ServerCommand::Connection(ConnectionCommand::ClientMessage {
            from: connection_id,
            message: ClientMessage::JoinRoom(room_id("lobby")),
        }))
        .await
        .expect("");

    let (list_tx, list_rx) = tokio::sync::oneshot::channel();
    srv_tx
        .send(ServerCommand::Admin(AdminCommand::ListRooms { tx: list_tx }))
        .await
        .expect("");
    let rooms = list_rx.await.expect("");
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, room_id("lobby"));
    assert_eq!(rooms[0].members, 1);

    srv_tx
        .send(ServerCommand::Connection(ConnectionCommand::Disconnect {
            from: connection_id,
        }))
        .await
        .expect("");
    let (list_tx, list_rx) = tokio::sync::oneshot::channel();
    srv_tx
        .send(ServerCommand::Admin(AdminCommand::ListRooms { tx: list_tx }))
        .await
        .expect("");
    assert!(list_rx.await.expect("").is_empty());
}

#[tokio::test]
async fn it_should_bound_server_queue() {
    assert_eq!(spawn_server(4).max_capacity(), 4);
    assert_eq!(spawn_server(0).max_capacity(), 1);
}
