use serde::Serialize;
use tokio::sync::oneshot::Sender;
use whiteboard_system::RoomId;

#[derive(Debug)]
pub enum AdminCommand {
    ListRooms { tx: Sender<Vec<RoomSummary>> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub members: usize,
}
