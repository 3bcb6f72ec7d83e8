use reqwest::Client;
use serde::Serialize;

pub trait Notifier {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// Slack incoming webhook.
pub struct SlackWebhook {
    client: Client,
    url: String,
}

impl SlackWebhook {
    pub const fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

impl Notifier for SlackWebhook {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        #[derive(Serialize)]
        struct Payload<'a> {
            text: &'a str,
        }

        let response = self
            .client
            .post(&self.url)
            .json(&Payload { text })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            anyhow::bail!("webhook returned {status}: {}", reason.trim());
        }
        Ok(())
    }
}
