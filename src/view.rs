// What the controller can do to the screen: the message list, the
// notification banner, and the login-form / chat-view switch.
use crate::form::FormField;
use crate::message::{ChatMessage, Sender, CODE_LEFT};
use colored::Colorize;
use std::io::Write;
use tracing::warn;

pub trait View {
    /// Appends one entry to the message list and scrolls to it.
    fn append(&mut self, message: ChatMessage);

    fn show_notification(&mut self, text: &str);

    /// Empties and hides the banner.
    fn clear_notification(&mut self);

    /// Hides the login form and reveals the chat view.
    fn show_chat(&mut self);

    fn prompt(&mut self, field: FormField);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub hidden: bool,
}

impl Default for Notification {
    fn default() -> Self {
        Self { text: String::new(), hidden: true }
    }
}

/// Headless view holding the same state a page would: useful for driving
/// the controller without a terminal.
#[derive(Debug, Clone)]
pub struct MemoryView {
    pub notification: Notification,
    pub login_form_visible: bool,
    pub chat_visible: bool,
    pub messages: Vec<ChatMessage>,
    /// How many times `show_chat` ran.
    pub chat_reveals: usize,
    pub prompts: Vec<FormField>,
}

impl Default for MemoryView {
    fn default() -> Self {
        Self {
            notification: Notification::default(),
            login_form_visible: true,
            chat_visible: false,
            messages: Vec::new(),
            chat_reveals: 0,
            prompts: Vec::new(),
        }
    }
}

impl View for MemoryView {
    fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    fn show_notification(&mut self, text: &str) {
        self.notification.text = text.to_string();
        self.notification.hidden = false;
    }

    fn clear_notification(&mut self) {
        self.notification.text.clear();
        self.notification.hidden = true;
    }

    fn show_chat(&mut self) {
        self.login_form_visible = false;
        self.chat_visible = true;
        self.chat_reveals += 1;
    }

    fn prompt(&mut self, field: FormField) {
        self.prompts.push(field);
    }
}

/// Line-oriented view for a terminal. A printed banner cannot be taken
/// back, so dismissal only matters for the next render.
pub struct TerminalView<W: Write> {
    out: W,
    banner_visible: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, banner_visible: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: impl std::fmt::Display) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("[View] Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> View for TerminalView<W> {
    fn append(&mut self, message: ChatMessage) {
        let line = match message.sender {
            Sender::Me => format!("you: {}", message.text).normal(),
            Sender::Other => message.text.blue(),
            Sender::System if message.system_code == Some(CODE_LEFT) => message.text.red(),
            Sender::System => message.text.green(),
        };
        self.write_line(line);
    }

    fn show_notification(&mut self, text: &str) {
        self.banner_visible = true;
        self.write_line(format!("! {}", text).red().bold());
    }

    fn clear_notification(&mut self) {
        self.banner_visible = false;
    }

    fn show_chat(&mut self) {
        self.write_line("Joined. Type a message and press Enter; /quit to leave.".dimmed());
    }

    fn prompt(&mut self, field: FormField) {
        let label = match field {
            FormField::Username => "Enter your username:",
            FormField::RoomCode => "Enter the chat room you want to join:",
        };
        if self.banner_visible {
            self.write_line("Choose a different username.".yellow());
        }
        self.write_line(label);
    }
}
