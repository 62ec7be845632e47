// Single-task event loop for the chat client: inbound channel events, user
// input, and the banner timer, handled one at a time in arrival order.
use crate::channel::Channel;
use crate::controller::{ChatController, Received};
use crate::form::{FormField, LoginForm};
use crate::message::ServerEvent;
use crate::session::SessionState;
use crate::view::View;
use std::future::Future;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

pub const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Server(ServerEvent),
    Input(InputEvent),
    NotificationExpired,
    ChannelClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Dispatcher<C: Channel, V: View> {
    controller: ChatController<C, V>,
    form: LoginForm,
    inbound: mpsc::UnboundedReceiver<ServerEvent>,
    input: mpsc::UnboundedReceiver<InputEvent>,
}

impl<C: Channel, V: View> Dispatcher<C, V> {
    pub fn new(
        controller: ChatController<C, V>,
        form: LoginForm,
        inbound: mpsc::UnboundedReceiver<ServerEvent>,
        input: mpsc::UnboundedReceiver<InputEvent>,
    ) -> Self {
        Self { controller, form, inbound, input }
    }

    pub fn controller(&self) -> &ChatController<C, V> {
        &self.controller
    }

    /// Submits a prefilled form, or prompts for the first missing field.
    pub fn start(&mut self) {
        self.advance_form();
    }

    /// Waits for whichever source is ready first.
    pub async fn next_event(&mut self) -> Event {
        let deadline = self.controller.notification_deadline();
        tokio::select! {
            event = self.inbound.recv() => match event {
                Some(event) => Event::Server(event),
                None => Event::ChannelClosed,
            },
            event = self.input.recv() => Event::Input(event.unwrap_or(InputEvent::Quit)),
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                Event::NotificationExpired
            }
        }
    }

    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Server(ServerEvent::MessageReceived(payload)) => {
                if self.controller.on_message_received(payload) == Received::Conflict {
                    self.form.clear(FormField::Username);
                    self.controller.view_mut().prompt(FormField::Username);
                }
            }
            Event::Input(InputEvent::Line(line)) => {
                if self.controller.accepts_input() {
                    if let Err(e) = self.controller.submit_input(&line) {
                        error!("[Client] Failed to send message: {}", e);
                    }
                } else if self.controller.state() == SessionState::Joining && self.form.missing().is_none() {
                    debug!("[Client] Waiting for join acknowledgment; input dropped.");
                } else {
                    self.form.enter(&line);
                    self.advance_form();
                }
            }
            Event::NotificationExpired => self.controller.dismiss_notification(),
            Event::Input(InputEvent::Quit) => return Flow::Stop,
            Event::ChannelClosed => {
                warn!("[Client] Channel closed.");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Runs until quit or channel close, then unloads. Returns the
    /// disconnect request still in flight, if one was sent.
    pub async fn run(mut self) -> Option<JoinHandle<()>> {
        self.start();
        loop {
            let event = self.next_event().await;
            if self.handle(event) == Flow::Stop {
                break;
            }
        }
        self.controller.handle_unload()
    }

    fn advance_form(&mut self) {
        match self.form.submission() {
            Some((username, room)) => {
                if let Err(e) = self.controller.initialize_session(username, room) {
                    error!("[Client] Join failed: {}", e);
                }
            }
            None => {
                if let Some(field) = self.form.missing() {
                    self.controller.view_mut().prompt(field);
                }
            }
        }
    }
}

/// Terminal input: stdin lines, with Ctrl-C mapped to `Quit` so that
/// teardown still sends the disconnect notification.
pub fn spawn_terminal_input() -> mpsc::UnboundedReceiver<InputEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    forward_interrupt(tx.clone(), tokio::signal::ctrl_c());
    spawn_stdin_reader(tx);
    rx
}

/// Sends `Quit` once `interrupt` resolves.
pub fn forward_interrupt<F>(tx: mpsc::UnboundedSender<InputEvent>, interrupt: F) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match interrupt.await {
            Ok(()) => {
                info!("[Input] Interrupted; leaving.");
                let _ = tx.send(InputEvent::Quit);
            }
            Err(e) => error!("[Input] Failed to listen for Ctrl-C: {}", e),
        }
    })
}

/// Reads stdin on a dedicated thread so a blocked read never holds up
/// runtime shutdown.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<InputEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let event = match line {
                Ok(line) if line.trim() == QUIT_COMMAND => InputEvent::Quit,
                Ok(line) => InputEvent::Line(line),
                Err(e) => {
                    error!("[Input] Failed to read stdin: {}", e);
                    InputEvent::Quit
                }
            };
            let quit = event == InputEvent::Quit;
            if tx.send(event).is_err() || quit {
                return;
            }
        }
        let _ = tx.send(InputEvent::Quit);
    });
}
