// Server side of one WebSocket connection.
use crate::message::{ClientEvent, IncomingMessage, ServerEvent, CODE_FORBIDDEN, CODE_INVALID};
use crate::rooms::{Peer, Rooms};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{tungstenite::protocol::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

pub async fn handle_connection(peer_addr: SocketAddr, ws_stream: WebSocketStream<TcpStream>, rooms: Rooms) {
    info!("[Conn {}] WebSocket connection established.", peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let peer = Peer { addr: peer_addr, outbox };

    loop {
        tokio::select! {
            // From this client
            frame = ws_receiver.next() => {
                let Some(msg_result) = frame else {
                    info!("[Conn {}] Stream ended.", peer_addr);
                    break;
                };
                match msg_result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(ClientEvent::Join(member)) => {
                            debug!("[Conn {}] Join {}@{}", peer_addr, member.username, member.room);
                            rooms.join(&member, peer.clone());
                        }
                        Ok(ClientEvent::SendMessage(message)) => {
                            if let Err(e) = rooms.relay(peer_addr, message) {
                                warn!("[Conn {}] Rejected message: {}", peer_addr, e);
                                peer.deliver(IncomingMessage::system(
                                    CODE_FORBIDDEN,
                                    "[ERROR] Join the room before sending messages.",
                                ));
                            }
                        }
                        Err(e) => {
                            warn!("[Conn {}] Failed to deserialize frame: {}. Raw: {}", peer_addr, e, text);
                            peer.deliver(IncomingMessage::system(
                                CODE_INVALID,
                                r#"[ERROR] Could not understand your message. Expected JSON like {"event": "join", "data": {...}}."#,
                            ));
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("[Conn {}] Received close message from client.", peer_addr);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            error!("[Conn {}] Error sending Pong.", peer_addr);
                            break;
                        }
                    }
                    Ok(_) => debug!("[Conn {}] Received unhandled WebSocket message type.", peer_addr),
                    Err(e) => {
                        error!("[Conn {}] Error receiving WebSocket message: {}", peer_addr, e);
                        break;
                    }
                }
            }

            // Addressed to this client by the room registry
            Some(event) = outbox_rx.recv() => {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json)).await.is_err() {
                            error!("[Conn {}] Failed to send to WebSocket.", peer_addr);
                            break;
                        }
                    }
                    Err(e) => error!("[Conn {}] Failed to serialize event: {}", peer_addr, e),
                }
            }
        }
    }

    let left = rooms.leave_all(peer_addr);
    let names: Vec<String> = left.iter().map(|m| format!("{}@{}", m.username, m.room)).collect();
    info!("[Conn {}] Disconnected. Memberships dropped: {:?}", peer_addr, names);
}
