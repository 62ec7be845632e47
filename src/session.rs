use crate::message::Member;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    /// Join emitted, no acknowledgment yet. A 409 leaves the session here.
    Joining,
    Joined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub room: String,
    pub connected: bool,
}

impl Session {
    /// Trims both fields. Returns `None` if either ends up empty.
    pub fn new(username: &str, room: &str) -> Option<Self> {
        let username = username.trim();
        let room = room.trim();
        if username.is_empty() || room.is_empty() {
            return None;
        }
        Some(Self { username: username.to_string(), room: room.to_string(), connected: false })
    }

    pub fn member(&self) -> Member {
        Member { room: self.room.clone(), username: self.username.clone() }
    }
}
