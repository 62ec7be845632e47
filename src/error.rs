use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Username and room are required")]
    InvalidCredentials,

    #[error("No session: join a room before sending messages")]
    NotJoined,

    #[error("Channel is closed")]
    ChannelClosed,

    #[error("{username} is not a member of room {room}")]
    UnknownMember { room: String, username: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
