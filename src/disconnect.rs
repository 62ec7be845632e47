use crate::error::Result;
use crate::message::{DisconnectRequest, DisconnectResponse, Member};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Client for the server's `user_disconnect` endpoint.
#[derive(Clone, Debug)]
pub struct DisconnectClient {
    http: reqwest::Client,
    url: String,
}

impl DisconnectClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/user_disconnect", base_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn notify(&self, member: Member) -> Result<DisconnectResponse> {
        let response = self
            .http
            .post(&self.url)
            .json(&DisconnectRequest { data: member })
            .send()
            .await?;
        Ok(response.json::<DisconnectResponse>().await?)
    }

    /// Sends the notification in the background. Failures are logged and
    /// dropped; the handle may be awaited or abandoned.
    pub fn spawn(&self, member: Member) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let who = format!("{}@{}", member.username, member.room);
            match client.notify(member).await {
                Ok(response) => info!("[Disconnect {}] {}", who, response.message),
                Err(e) => error!("[Disconnect {}] Error sending data: {}", who, e),
            }
        })
    }
}
