// Bidirectional event channel between the chat client and the room server.
use crate::error::{ChatError, Result};
use crate::message::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

/// Outbound half of the channel as seen by the controller. Emitting never
/// waits on the network; frames are handed to the connection task.
pub trait Channel {
    fn emit(&mut self, event: ClientEvent) -> Result<()>;

    /// Terminates the connection. The inbound stream ends shortly after.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

enum Outbound {
    Event(ClientEvent),
    Close,
}

pub struct WsChannel {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl Channel for WsChannel {
    fn emit(&mut self, event: ClientEvent) -> Result<()> {
        if self.closed {
            return Err(ChatError::ChannelClosed);
        }
        self.tx.send(Outbound::Event(event)).map_err(|_| ChatError::ChannelClosed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.tx.send(Outbound::Close);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed || self.tx.is_closed()
    }
}

/// Opens the WebSocket and spawns the task that owns it. Returns the
/// outbound handle and the stream of inbound events in arrival order.
pub async fn connect(url: &str) -> Result<(WsChannel, mpsc::UnboundedReceiver<ServerEvent>)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("[Channel] Connected to {}", url);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerEvent>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                outbound = out_rx.recv() => match outbound {
                    Some(Outbound::Event(event)) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                error!("[Channel] Failed to serialize outbound event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sender.send(Message::Text(json)).await {
                            error!("[Channel] Failed to send frame: {}", e);
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws_sender.send(Message::Close(None)).await;
                        info!("[Channel] Closed by client.");
                        break;
                    }
                },
                frame = ws_receiver.next() => match frame {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("[Channel] Dropping unparseable frame: {}. Raw: {}", e, text),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            error!("[Channel] Error sending Pong.");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("[Channel] Closed by server.");
                        break;
                    }
                    Some(Ok(_)) => debug!("[Channel] Ignoring non-text frame."),
                    Some(Err(e)) => {
                        error!("[Channel] Error receiving frame: {}", e);
                        break;
                    }
                }
            }
        }
    });

    Ok((WsChannel { tx: out_tx, closed: false }, in_rx))
}

/// Records emitted events instead of sending them.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingChannel {
    pub emitted: Vec<ClientEvent>,
    pub closed: bool,
    pub closes: usize,
}

#[cfg(test)]
impl Channel for RecordingChannel {
    fn emit(&mut self, event: ClientEvent) -> Result<()> {
        if self.closed {
            return Err(ChatError::ChannelClosed);
        }
        self.emitted.push(event);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.closes += 1;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
