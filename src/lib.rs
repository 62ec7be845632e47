pub mod channel;
pub mod config;
pub mod connection;
pub mod controller;
pub mod disconnect;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod message;
pub mod rooms;
pub mod server;
pub mod session;
pub mod view;

pub use controller::ChatController;
pub use error::{ChatError, Result};
