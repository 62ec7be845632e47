//! Chat client controller: turns form/input events into channel events and
//! channel events into view updates.
//!
//! All session state lives on [`ChatController`]; handlers take `&mut self`
//! and run to completion, so the dispatch loop never interleaves them.

use crate::channel::Channel;
use crate::disconnect::DisconnectClient;
use crate::error::{ChatError, Result};
use crate::message::{ChatMessage, ClientEvent, IncomingMessage, OutgoingMessage};
use crate::session::{Session, SessionState};
use crate::view::View;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// What an inbound message did to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// 409: banner shown, session stays in `Joining`.
    Conflict,
    /// First acknowledgment: chat view revealed.
    Joined,
    /// Appended to the list, nothing else changed.
    Appended,
}

pub struct ChatController<C: Channel, V: View> {
    channel: C,
    view: V,
    disconnect: DisconnectClient,
    session: Option<Session>,
    state: SessionState,
    first_run: bool,
    conflict: bool,
    notification_ttl: Duration,
    notification_deadline: Option<Instant>,
    unloaded: bool,
}

impl<C: Channel, V: View> ChatController<C, V> {
    pub fn new(channel: C, view: V, disconnect: DisconnectClient) -> Self {
        Self {
            channel,
            view,
            disconnect,
            session: None,
            state: SessionState::Unjoined,
            first_run: true,
            conflict: false,
            notification_ttl: NOTIFICATION_TTL,
            notification_deadline: None,
            unloaded: false,
        }
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Message input is live only after the chat view has been revealed.
    pub fn accepts_input(&self) -> bool {
        self.state == SessionState::Joined
    }

    pub fn notification_deadline(&self) -> Option<Instant> {
        self.notification_deadline
    }

    /// Login form submit. Both fields must be non-empty after trimming;
    /// otherwise the channel is closed and nothing is emitted.
    pub fn initialize_session(&mut self, username: &str, room: &str) -> Result<()> {
        if self.state == SessionState::Joined {
            warn!("[Client] Already joined; ignoring login form submit.");
            return Ok(());
        }
        let Some(mut session) = Session::new(username, room) else {
            error!("[Client] Username and room are required");
            self.channel.close();
            return Err(ChatError::InvalidCredentials);
        };

        self.channel.emit(ClientEvent::Join(session.member()))?;
        session.connected = true;
        info!("[Client {}@{}] Join requested.", session.username, session.room);

        // A resubmitted form gets a fresh chance to reveal the chat view.
        self.conflict = false;
        self.session = Some(session);
        self.state = SessionState::Joining;
        Ok(())
    }

    /// Emits the message and echoes it locally without waiting for the server.
    pub fn send_message(&mut self, text: &str) -> Result<()> {
        let session = self.session.as_ref().ok_or(ChatError::NotJoined)?;
        let outgoing = OutgoingMessage {
            room: session.room.clone(),
            username: session.username.clone(),
            message: text.to_string(),
        };
        debug!("[Client {}@{}] Sending: {:?}", session.username, session.room, outgoing.message);
        self.channel.emit(ClientEvent::SendMessage(outgoing))?;
        self.view.append(ChatMessage::mine(text));
        Ok(())
    }

    /// Enter in the message input. Blank input is ignored, and so is
    /// anything typed before the chat view is live.
    pub fn submit_input(&mut self, text: &str) -> Result<()> {
        if !self.accepts_input() {
            debug!("[Client] Input ignored before join.");
            return Ok(());
        }
        if text.trim().is_empty() {
            return Ok(());
        }
        self.send_message(text)
    }

    pub fn on_message_received(&mut self, payload: IncomingMessage) -> Received {
        if !payload.is_system() {
            let username = payload.username.as_deref().unwrap_or("unknown");
            self.view.append(ChatMessage::from_other(username, &payload.message));
            return Received::Appended;
        }

        let is_conflict = payload.is_conflict();
        if is_conflict {
            warn!("[Client] Join rejected: {}", payload.message);
            self.conflict = true;
            self.view.show_notification(&payload.message);
            self.notification_deadline = Some(Instant::now() + self.notification_ttl);
        } else {
            self.view.append(ChatMessage::system(payload.message, payload.code));
        }

        // Only a pending join can be acknowledged.
        if self.first_run && !self.conflict && self.state == SessionState::Joining {
            self.first_run = false;
            self.state = SessionState::Joined;
            self.view.show_chat();
            if let Some(session) = &self.session {
                info!("[Client {}@{}] Joined.", session.username, session.room);
            }
            return Received::Joined;
        }

        if is_conflict {
            Received::Conflict
        } else {
            Received::Appended
        }
    }

    /// Banner timer fired.
    pub fn dismiss_notification(&mut self) {
        self.notification_deadline = None;
        self.view.clear_notification();
    }

    /// Teardown. Runs at most once: closes the channel if still open and fires the
    /// disconnect request in the background. The returned handle is the
    /// request in flight; nothing waits on it unless the caller chooses to.
    pub fn handle_unload(&mut self) -> Option<JoinHandle<()>> {
        if self.unloaded {
            return None;
        }
        self.unloaded = true;
        if !self.channel.is_closed() {
            self.channel.close();
        }

        let Some(session) = &self.session else {
            debug!("[Client] Unload before any join; nothing to disconnect.");
            return None;
        };
        info!("[Client {}@{}] Unloading; notifying {}", session.username, session.room, self.disconnect.url());
        Some(self.disconnect.spawn(session.member()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RecordingChannel;
    use crate::message::{Member, Sender, CODE_CONFLICT, CODE_LEFT, CODE_OK};
    use crate::view::MemoryView;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type Controller = ChatController<RecordingChannel, MemoryView>;

    fn controller() -> Controller {
        ChatController::new(
            RecordingChannel::default(),
            MemoryView::default(),
            DisconnectClient::new("http://127.0.0.1:9"),
        )
    }

    fn joined(username: &str, room: &str) -> Controller {
        let mut c = controller();
        c.initialize_session(username, room).unwrap();
        c.on_message_received(IncomingMessage::system(CODE_OK, "[INFO] Connected to the chat room."));
        c
    }

    #[test]
    fn blank_credentials_close_without_joining() {
        for (username, room) in [("", "r1"), ("alice", ""), ("   ", "r1"), ("alice", " \t "), ("", "")] {
            let mut c = controller();
            let err = c.initialize_session(username, room).unwrap_err();
            assert!(matches!(err, ChatError::InvalidCredentials));
            assert!(c.channel().emitted.is_empty());
            assert!(c.channel().closed);
            assert_eq!(c.state(), SessionState::Unjoined);
            assert!(c.session().is_none());
        }
    }

    #[test]
    fn valid_credentials_emit_exactly_one_join() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();

        assert_eq!(
            c.channel().emitted,
            vec![ClientEvent::Join(Member { room: "r1".into(), username: "alice".into() })]
        );
        assert_eq!(c.state(), SessionState::Joining);
        assert!(c.session().unwrap().connected);
        assert!(!c.channel().closed);
    }

    #[test]
    fn conflict_shows_banner_and_keeps_login_form() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();

        let outcome = c.on_message_received(IncomingMessage::system(CODE_CONFLICT, "Username already exists"));

        assert_eq!(outcome, Received::Conflict);
        assert_eq!(c.state(), SessionState::Joining);
        assert!(!c.accepts_input());
        let view = c.view();
        assert!(!view.chat_visible);
        assert!(view.login_form_visible);
        assert!(!view.notification.hidden);
        assert_eq!(view.notification.text, "Username already exists");
        assert!(view.messages.is_empty());
        assert!(c.notification_deadline().is_some());
    }

    #[test]
    fn dismissing_clears_and_hides_banner() {
        let mut c = controller();
        c.on_message_received(IncomingMessage::system(CODE_CONFLICT, "taken"));
        c.dismiss_notification();
        assert!(c.view().notification.hidden);
        assert!(c.view().notification.text.is_empty());
        assert!(c.notification_deadline().is_none());
    }

    #[test]
    fn first_system_message_reveals_chat_once() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();

        assert_eq!(c.on_message_received(IncomingMessage::system(CODE_OK, "connected")), Received::Joined);
        assert_eq!(c.on_message_received(IncomingMessage::system(CODE_OK, "bob has joined")), Received::Appended);
        assert_eq!(c.on_message_received(IncomingMessage::system(CODE_LEFT, "bob has left")), Received::Appended);

        let view = c.view();
        assert_eq!(view.chat_reveals, 1);
        assert!(view.chat_visible);
        assert!(!view.login_form_visible);
        assert_eq!(view.messages.len(), 3);
        assert!(view.messages.iter().all(|m| m.sender == Sender::System));
        assert_eq!(view.messages[2].system_code, Some(CODE_LEFT));
        assert_eq!(c.state(), SessionState::Joined);
    }

    #[test]
    fn conflict_then_resubmit_can_still_join() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();
        c.on_message_received(IncomingMessage::system(CODE_CONFLICT, "taken"));
        assert_eq!(c.view().chat_reveals, 0);

        c.initialize_session("carol", "r1").unwrap();
        assert_eq!(c.on_message_received(IncomingMessage::system(CODE_OK, "connected")), Received::Joined);
        assert_eq!(c.session().unwrap().username, "carol");
        assert_eq!(c.channel().emitted.len(), 2);
    }

    #[test]
    fn conflict_blocks_reveal_until_resubmit() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();
        c.on_message_received(IncomingMessage::system(CODE_CONFLICT, "taken"));

        let outcome = c.on_message_received(IncomingMessage::system(CODE_OK, "bob has joined"));

        assert_eq!(outcome, Received::Appended);
        assert_eq!(c.view().chat_reveals, 0);
        assert!(!c.view().chat_visible);
        assert_eq!(c.state(), SessionState::Joining);
        assert!(!c.accepts_input());
    }

    #[test]
    fn system_message_before_join_does_not_reveal_chat() {
        let mut c = controller();

        let outcome = c.on_message_received(IncomingMessage::system(CODE_OK, "Welcome!"));

        assert_eq!(outcome, Received::Appended);
        assert_eq!(c.state(), SessionState::Unjoined);
        assert!(!c.accepts_input());
        assert_eq!(c.view().chat_reveals, 0);
        assert_eq!(c.view().messages, vec![ChatMessage::system("Welcome!", Some(CODE_OK))]);

        c.initialize_session("alice", "r1").unwrap();
        assert_eq!(c.on_message_received(IncomingMessage::system(CODE_OK, "connected")), Received::Joined);
        assert_eq!(c.view().chat_reveals, 1);
    }

    #[tokio::test]
    async fn unload_leaves_an_already_closed_channel_alone() {
        let mut c = controller();
        c.initialize_session("", "r1").unwrap_err();
        assert!(c.channel().closed);
        assert_eq!(c.channel().closes, 1);

        c.handle_unload();
        assert_eq!(c.channel().closes, 1);
    }

    #[test]
    fn send_emits_and_echoes_locally() {
        let mut c = joined("alice", "r1");
        let before = c.view().messages.len();

        c.send_message("hello").unwrap();

        assert_eq!(
            c.channel().emitted.last(),
            Some(&ClientEvent::SendMessage(OutgoingMessage {
                room: "r1".into(),
                username: "alice".into(),
                message: "hello".into(),
            }))
        );
        let added = &c.view().messages[before..];
        assert_eq!(added, &[ChatMessage::mine("hello")]);
    }

    #[test]
    fn send_without_session_fails() {
        let mut c = controller();
        assert!(matches!(c.send_message("hello"), Err(ChatError::NotJoined)));
        assert!(c.channel().emitted.is_empty());
        assert!(c.view().messages.is_empty());
    }

    #[test]
    fn blank_or_early_input_is_ignored() {
        let mut c = controller();
        c.initialize_session("alice", "r1").unwrap();
        c.submit_input("too early").unwrap();
        assert_eq!(c.channel().emitted.len(), 1);

        c.on_message_received(IncomingMessage::system(CODE_OK, "connected"));
        c.submit_input("   ").unwrap();
        c.submit_input("hi all").unwrap();
        assert_eq!(c.channel().emitted.len(), 2);
    }

    #[test]
    fn chat_message_from_other_user() {
        let mut c = joined("alice", "r1");
        let before = c.view().messages.len();
        let member = Member { room: "r1".into(), username: "bob".into() };

        let outcome = c.on_message_received(IncomingMessage::chat(&member, "hi"));

        assert_eq!(outcome, Received::Appended);
        let added = &c.view().messages[before..];
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].text, "bob: hi");
        assert_eq!(added[0].sender, Sender::Other);
    }

    #[test]
    fn chat_message_does_not_reveal_chat_view() {
        let mut c = controller();
        let member = Member { room: "r1".into(), username: "bob".into() };
        c.on_message_received(IncomingMessage::chat(&member, "hi"));
        assert_eq!(c.view().chat_reveals, 0);
    }

    #[tokio::test]
    async fn unload_posts_disconnect_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user_disconnect"))
            .and(body_json(json!({"data": {"room": "r1", "username": "alice"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut c = ChatController::new(
            RecordingChannel::default(),
            MemoryView::default(),
            DisconnectClient::new(&server.uri()),
        );
        c.initialize_session("alice", "r1").unwrap();

        let handle = c.handle_unload().expect("first unload sends");
        assert!(c.handle_unload().is_none());
        handle.await.unwrap();
        assert!(c.channel().closed);
    }

    #[tokio::test]
    async fn unload_before_join_sends_nothing() {
        let mut c = controller();
        assert!(c.handle_unload().is_none());
        assert!(c.channel().closed);
    }
}
