use crate::admin::RoomSummary;
use crate::room::Room;
use std::collections::HashMap;
use std::num::Wrapping;
use whiteboard_system::{ConnectionId, RoomId};

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    Joined(RoomId),
}

/// Room membership for every live connection.
///
/// Owned by the server task; every mutation goes through `join_room`,
/// `leave_room` or `disconnect`, so an emptied room is removed before any
/// later join can observe it.
pub struct RoomRegistry {
    connection_id_source: Wrapping<ConnectionId>,
    connection_states: HashMap<ConnectionId, ConnectionState>,
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            connection_states: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    pub fn create_connection(&mut self) -> ConnectionId {
        let connection_id = self.new_connection_id();
        self.connection_states
            .insert(connection_id, ConnectionState::Idle);
        connection_id
    }

    pub fn has_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&RoomId> {
        match self.connection_states.get(connection_id) {
            Some(ConnectionState::Joined(room_id)) => Some(room_id),
            _ => None,
        }
    }

    /// Leaves the current room (if any) and joins `room_id`, creating it when
    /// unknown. Returns the room that was left.
    pub fn join_room(&mut self, connection_id: &ConnectionId, room_id: &RoomId) -> Option<RoomId> {
        if self.room_of(connection_id) == Some(room_id) {
            return None;
        }
        let previous = self.leave_room(connection_id);

        if !self.has_room(room_id) {
            log::info!("Room {} created", room_id);
        }
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(Room::new)
            .add(*connection_id);
        self.connection_states
            .insert(*connection_id, ConnectionState::Joined(room_id.clone()));
        log::info!("Connection {} joined room {}", connection_id, room_id);
        previous
    }

    pub fn leave_room(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        let room_id = match self.connection_states.get_mut(connection_id) {
            Some(state) => match std::mem::replace(state, ConnectionState::Idle) {
                ConnectionState::Joined(room_id) => room_id,
                ConnectionState::Idle => return None,
            },
            None => return None,
        };

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.remove(connection_id);
            if room.is_empty() {
                self.rooms.remove(&room_id);
                log::info!("Room {} removed", room_id);
            }
        }
        Some(room_id)
    }

    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        let room_id = self.leave_room(connection_id);
        self.connection_states.remove(connection_id);
        room_id
    }

    pub fn connection_ids_in_room(&self, room_id: &RoomId) -> &[ConnectionId] {
        self.rooms
            .get(room_id)
            .map(|r| r.connections.as_slice())
            .unwrap_or(&[])
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut summaries = self
            .rooms
            .iter()
            .map(|(room_id, room)| RoomSummary {
                room_id: room_id.clone(),
                members: room.connections.len(),
            })
            .collect::<Vec<_>>();
        summaries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        summaries
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        loop {
            self.connection_id_source += Wrapping(1);
            let candidate = self.connection_id_source.0;
            if !self.connection_states.contains_key(&candidate) {
                break candidate;
            }
        }
    }
}
