// Room membership for the relay server.
use crate::error::{ChatError, Result};
use crate::message::{
    IncomingMessage, Member, OutgoingMessage, ServerEvent, CODE_CONFLICT, CODE_LEFT, CODE_OK,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const CONNECTED_MESSAGE: &str = "[INFO] Connected to the chat room.";
pub const CONFLICT_MESSAGE: &str =
    "[ERROR] Username already exists in the room. Please choose a different username.";

/// One connection's outbox.
#[derive(Clone, Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    pub outbox: mpsc::UnboundedSender<ServerEvent>,
}

impl Peer {
    pub fn deliver(&self, payload: IncomingMessage) -> bool {
        self.outbox.send(ServerEvent::MessageReceived(payload)).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Conflict,
}

#[derive(Default, Debug)]
struct Room {
    members: HashMap<String, Peer>,
}

impl Room {
    /// Sends to every member except `skip`. Returns how many got it.
    fn broadcast(&self, payload: &IncomingMessage, skip: &str) -> usize {
        let mut delivered = 0;
        for (username, peer) in &self.members {
            if username == skip {
                continue;
            }
            if peer.deliver(payload.clone()) {
                delivered += 1;
            } else {
                debug!("[Rooms] Outbox for {} is gone.", username);
            }
        }
        delivered
    }
}

#[derive(Clone, Default, Debug)]
pub struct Rooms {
    inner: Arc<Mutex<HashMap<String, Room>>>,
}

impl Rooms {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Room>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `member` unless the username is taken in that room. The joiner's
    /// acknowledgment is queued before anyone else hears about the join.
    pub fn join(&self, member: &Member, peer: Peer) -> JoinOutcome {
        let mut rooms = self.lock();
        let room = rooms.entry(member.room.clone()).or_default();

        if room.members.contains_key(&member.username) {
            info!("[Rooms] {} already taken in {}", member.username, member.room);
            peer.deliver(IncomingMessage::system(CODE_CONFLICT, CONFLICT_MESSAGE));
            return JoinOutcome::Conflict;
        }

        peer.deliver(IncomingMessage::system(CODE_OK, CONNECTED_MESSAGE).about(member));
        let announcement =
            IncomingMessage::system(CODE_OK, format!("{} has joined the chat room.", member.username)).about(member);
        room.broadcast(&announcement, &member.username);
        room.members.insert(member.username.clone(), peer);
        info!("[Rooms] Added {} to chat room {}", member.username, member.room);
        JoinOutcome::Joined
    }

    /// Fans a chat message out to the rest of the room. The sender must be
    /// the connection that joined under that username.
    pub fn relay(&self, from: SocketAddr, message: OutgoingMessage) -> Result<usize> {
        let rooms = self.lock();
        let room = rooms
            .get(&message.room)
            .filter(|room| room.members.get(&message.username).is_some_and(|peer| peer.addr == from))
            .ok_or_else(|| ChatError::UnknownMember {
                room: message.room.clone(),
                username: message.username.clone(),
            })?;

        let sender = Member { room: message.room.clone(), username: message.username.clone() };
        let delivered = room.broadcast(&IncomingMessage::chat(&sender, message.message), &sender.username);
        debug!("[Rooms] {}@{} -> {} recipient(s)", sender.username, sender.room, delivered);
        Ok(delivered)
    }

    pub fn leave(&self, member: &Member) -> Result<()> {
        let mut rooms = self.lock();
        let removed = rooms
            .get_mut(&member.room)
            .and_then(|room| room.members.remove(&member.username));
        if removed.is_none() {
            return Err(ChatError::UnknownMember {
                room: member.room.clone(),
                username: member.username.clone(),
            });
        }
        Self::announce_leave(&mut rooms, member);
        Ok(())
    }

    /// Drops every membership held by a closed connection.
    pub fn leave_all(&self, addr: SocketAddr) -> Vec<Member> {
        let mut rooms = self.lock();
        let mut left = Vec::new();
        for (name, room) in rooms.iter_mut() {
            room.members.retain(|username, peer| {
                if peer.addr == addr {
                    left.push(Member { room: name.clone(), username: username.clone() });
                    false
                } else {
                    true
                }
            });
        }
        for member in &left {
            Self::announce_leave(&mut rooms, member);
        }
        left
    }

    fn announce_leave(rooms: &mut HashMap<String, Room>, member: &Member) {
        info!("[Rooms] {} left chat room {}", member.username, member.room);
        let Some(room) = rooms.get(&member.room) else { return };
        if room.members.is_empty() {
            rooms.remove(&member.room);
            info!("[Rooms] Room '{}' deleted as it became empty.", member.room);
            return;
        }
        let goodbye =
            IncomingMessage::system(CODE_LEFT, format!("{} has left the chat room.", member.username)).about(member);
        room.broadcast(&goodbye, &member.username);
    }

    /// Sorted usernames in `room`.
    pub fn members(&self, room: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .get(room)
            .map(|room| room.members.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn room_count(&self) -> usize {
        self.lock().len()
    }
}
