use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use tokio::sync::mpsc::error::TrySendError;
use whiteboard_system::{ClientMessage, ConnectionId, MessageError, Rejection, ServerMessage};

use crate::config::Config;
use crate::connection_tx_storage::ConnectionTx;
use crate::server::{ServerCommand, ServerTx};

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    ClientMessage {
        from: ConnectionId,
        message: ClientMessage,
    },
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected { connection_id: ConnectionId },
    ServerMessage(ServerMessage),
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

enum ConnectionState {
    // Ingress received before the server assigns an id is held in order.
    Idle(Vec<ClientMessage>),
    Connected(ConnectionId),
}

struct ConnectionActor {
    state: ConnectionState,
    srv_tx: ServerTx,
    buffer: usize,
    heartbeat: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
}

impl ConnectionActor {
    fn new(srv_tx: ServerTx, config: &Config) -> Self {
        Self {
            state: ConnectionState::Idle(Vec::new()),
            srv_tx,
            buffer: config.connection_buffer.max(1),
            heartbeat: Instant::now(),
            heartbeat_interval: config.heartbeat_interval(),
            client_timeout: config.client_timeout(),
        }
    }

    /// Connect and Disconnect must reach the server even while its queue is full.
    fn send_control(&self, command: ConnectionCommand) {
        let srv_tx = self.srv_tx.clone();
        tokio::spawn(async move {
            if srv_tx.send(ServerCommand::Connection(command)).await.is_err() {
                log::error!("Server task is gone");
            }
        });
    }

    fn send_to_server(
        &self,
        from: ConnectionId,
        message: ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let command = ServerCommand::Connection(ConnectionCommand::ClientMessage { from, message });
        match self.srv_tx.try_send(command) {
            Ok(()) => (),
            Err(TrySendError::Full(_)) => {
                log::warn!("Server queue is full, refusing frame from {}", from);
                let busy = ServerMessage::Rejected(Rejection {
                    reason: "server is busy".into(),
                });
                self.egress(&busy, ctx);
            }
            Err(TrySendError::Closed(_)) => {
                log::error!("Server task is gone, closing connection");
                ctx.stop();
            }
        }
    }

    fn forward(&mut self, message: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        if let ConnectionState::Connected(from) = self.state {
            self.send_to_server(from, message, ctx);
        } else if let ConnectionState::Idle(pending) = &mut self.state {
            pending.push(message);
        }
    }

    fn handle_decoded(
        &mut self,
        decoded: Result<ClientMessage, MessageError>,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match decoded {
            Ok(message) => self.forward(message, ctx),
            Err(error) => {
                log::warn!("Rejected frame: {}", error);
                self.egress(&ServerMessage::rejected(&error), ctx);
            }
        }
    }

    fn egress(&self, message: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match message.to_json() {
            Ok(text) => ctx.text(text),
            Err(error) => log::error!("Failed to encode {:?}: {}", message, error),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > act.client_timeout {
                log::warn!("Heartbeat timed out, closing connection");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ConnectionEvent>(self.buffer);

        self.send_control(ConnectionCommand::Connect { tx });

        let addr = ctx.address().recipient();
        let srv_tx = self.srv_tx.clone();

        tokio::spawn(async move {
            log::debug!("connection green thread - started");
            let mut connection_id = None;
            while let Some(event) = rx.recv().await {
                if let ConnectionEvent::Connected { connection_id: id } = event {
                    connection_id = Some(id);
                }
                if !addr.connected() {
                    // Actor died before it could report its own disconnect.
                    if let Some(from) = connection_id {
                        let _ = srv_tx
                            .send(ServerCommand::Connection(ConnectionCommand::Disconnect {
                                from,
                            }))
                            .await;
                    }
                    break;
                }
                addr.do_send(ConnectionActorMessage(event));
            }
            log::debug!("connection green thread - terminated");
        });

        self.start_heartbeat(ctx);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        if let ConnectionState::Connected(from) = self.state {
            self.send_control(ConnectionCommand::Disconnect { from });
        }

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.heartbeat = Instant::now();
                self.handle_decoded(ClientMessage::from_json(&text), ctx);
            }
            Ok(ws::Message::Binary(bin)) => {
                self.heartbeat = Instant::now();
                log::debug!("Ingress size: {}", bin.len());
                self.handle_decoded(ClientMessage::from_slice(&bin), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                log::warn!("Fragmented frames are not supported, closing connection");
                ctx.stop();
            }
            Ok(ws::Message::Nop) => (),
            Err(error) => {
                log::warn!("WebSocket protocol error: {}", error);
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        log::debug!("Egress {:?}", msg.0);
        match msg.0 {
            ConnectionEvent::Connected { connection_id } => {
                let previous =
                    std::mem::replace(&mut self.state, ConnectionState::Connected(connection_id));
                if let ConnectionState::Idle(pending) = previous {
                    for message in pending {
                        self.forward(message, ctx);
                    }
                }
            }
            ConnectionEvent::ServerMessage(message) => self.egress(&message, ctx),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    ws::start(
        ConnectionActor::new(srv_tx.get_ref().clone(), config.get_ref()),
        &req,
        stream,
    )
}
