use whiteboard_system::ConnectionId;

pub struct Room {
    pub connections: Vec<ConnectionId>,
}

impl Room {
    pub fn new() -> Self {
        Self {
            connections: Vec::new(),
        }
    }

    pub fn add(&mut self, connection_id: ConnectionId) {
        if !self.connections.contains(&connection_id) {
            self.connections.push(connection_id);
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) {
        self.connections.retain(|c| c != connection_id);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
