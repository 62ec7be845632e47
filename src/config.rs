use clap::Args;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address for WebSocket room traffic
    #[arg(long, env = "ROOMCHAT_WS_ADDR", default_value = "127.0.0.1:8080")]
    pub ws_addr: SocketAddr,

    /// Address for the HTTP disconnect endpoint
    #[arg(long, env = "ROOMCHAT_HTTP_ADDR", default_value = "127.0.0.1:8081")]
    pub http_addr: SocketAddr,
}

#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the room server
    #[arg(long, env = "ROOMCHAT_SERVER", default_value = "ws://127.0.0.1:8080")]
    pub server: String,

    /// Base URL of the HTTP endpoint that receives `user_disconnect`
    #[arg(long, env = "ROOMCHAT_HTTP", default_value = "http://127.0.0.1:8081")]
    pub http: String,

    /// Username; prompted for when absent
    #[arg(short, long, env = "ROOMCHAT_USERNAME")]
    pub username: Option<String>,

    /// Room code; prompted for when absent
    #[arg(short, long, env = "ROOMCHAT_ROOM")]
    pub room: Option<String>,

    /// Seconds the conflict banner stays up
    #[arg(long, default_value_t = 5)]
    pub notification_secs: u64,

    /// Longest wait for the disconnect response on exit
    #[arg(long, default_value_t = 500)]
    pub unload_grace_ms: u64,
}

impl ClientConfig {
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }

    pub fn unload_grace(&self) -> Duration {
        Duration::from_millis(self.unload_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct ClientArgs {
        #[command(flatten)]
        config: ClientConfig,
    }

    #[derive(Parser)]
    struct ServerArgs {
        #[command(flatten)]
        config: ServerConfig,
    }

    #[test]
    fn client_defaults() {
        let config = ClientArgs::parse_from(["roomchat", "--server", "ws://localhost:1", "--http", "http://localhost:2"]).config;
        assert_eq!(config.server, "ws://localhost:1");
        assert_eq!(config.notification_ttl(), Duration::from_secs(5));
        assert_eq!(config.unload_grace(), Duration::from_millis(500));
    }

    #[test]
    fn client_form_fields_from_flags() {
        let config = ClientArgs::parse_from(["roomchat", "-u", "alice", "-r", "r1", "--notification-secs", "2"]).config;
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.room.as_deref(), Some("r1"));
        assert_eq!(config.notification_ttl(), Duration::from_secs(2));
    }

    #[test]
    fn server_addresses_parse() {
        let config = ServerArgs::parse_from(["roomchat", "--ws-addr", "0.0.0.0:7081", "--http-addr", "0.0.0.0:6652"]).config;
        assert_eq!(config.ws_addr.port(), 7081);
        assert_eq!(config.http_addr.port(), 6652);
    }
}
