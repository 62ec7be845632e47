// Wire events exchanged over the channel, plus the transient display message.
use serde::{Deserialize, Serialize};

pub const SYSTEM_MESSAGE: &str = "SYSTEM_MESSAGE";
pub const USER_MESSAGE: &str = "USER_MESSAGE";

pub const CODE_OK: i64 = 200;
/// Member left the room.
pub const CODE_LEFT: i64 = 400;
/// Sender is not a member of the room it wrote to.
pub const CODE_FORBIDDEN: i64 = 403;
/// Username already taken in the room.
pub const CODE_CONFLICT: i64 = 409;
/// Frame could not be understood.
pub const CODE_INVALID: i64 = 422;

/// A (room, username) pair. Body of `join` and of the disconnect request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub room: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub room: String,
    pub username: String,
    pub message: String,
}

/// Events a client emits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join(Member),
    SendMessage(OutgoingMessage),
}

/// Events the server emits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageReceived(IncomingMessage),
}

/// Payload of `message_received`. Anything whose `type` is not
/// `SYSTEM_MESSAGE` is treated as a chat message from another user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl IncomingMessage {
    pub fn system(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: SYSTEM_MESSAGE.to_string(),
            code: Some(code),
            message: message.into(),
            room: None,
            username: None,
        }
    }

    pub fn chat(member: &Member, message: impl Into<String>) -> Self {
        Self {
            kind: USER_MESSAGE.to_string(),
            code: Some(CODE_OK),
            message: message.into(),
            room: Some(member.room.clone()),
            username: Some(member.username.clone()),
        }
    }

    pub fn about(mut self, member: &Member) -> Self {
        self.room = Some(member.room.clone());
        self.username = Some(member.username.clone());
        self
    }

    pub fn is_system(&self) -> bool {
        self.kind == SYSTEM_MESSAGE
    }

    pub fn is_conflict(&self) -> bool {
        self.is_system() && self.code == Some(CODE_CONFLICT)
    }
}

/// Body of `POST user_disconnect`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub data: Member,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisconnectResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Me,
    Other,
    System,
}

/// A rendered list entry. Not retained after it is handed to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub system_code: Option<i64>,
}

impl ChatMessage {
    pub fn mine(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Me, system_code: None }
    }

    pub fn from_other(username: &str, message: &str) -> Self {
        Self { text: format!("{}: {}", username, message), sender: Sender::Other, system_code: None }
    }

    pub fn system(text: impl Into<String>, code: Option<i64>) -> Self {
        Self { text: text.into(), sender: Sender::System, system_code: code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_uses_named_event_envelope() {
        let event = ClientEvent::Join(Member { room: "r1".into(), username: "alice".into() });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "join", "data": {"room": "r1", "username": "alice"}})
        );
    }

    #[test]
    fn send_message_envelope() {
        let event = ClientEvent::SendMessage(OutgoingMessage {
            room: "r1".into(),
            username: "alice".into(),
            message: "hello".into(),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "send_message", "data": {"room": "r1", "username": "alice", "message": "hello"}})
        );
    }

    #[test]
    fn incoming_tolerates_missing_optional_fields() {
        let raw = r#"{"event":"message_received","data":{"type":"SYSTEM_MESSAGE","code":409,"message":"taken","color":"red"}}"#;
        let ServerEvent::MessageReceived(payload) = serde_json::from_str::<ServerEvent>(raw).unwrap();
        assert!(payload.is_conflict());
        assert_eq!(payload.room, None);
        assert_eq!(payload.message, "taken");
    }

    #[test]
    fn unknown_type_is_not_system() {
        let payload: IncomingMessage =
            serde_json::from_value(json!({"type": "MEDIA_MESSAGE", "username": "bob", "message": "x"})).unwrap();
        assert!(!payload.is_system());
        assert!(!payload.is_conflict());
    }

    #[test]
    fn disconnect_body_wraps_member_in_data() {
        let body = DisconnectRequest { data: Member { room: "r1".into(), username: "alice".into() } };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"data": {"room": "r1", "username": "alice"}})
        );
    }

    #[test]
    fn other_sender_is_prefixed_with_username() {
        let msg = ChatMessage::from_other("bob", "hi");
        assert_eq!(msg.text, "bob: hi");
        assert_eq!(msg.sender, Sender::Other);
    }
}
