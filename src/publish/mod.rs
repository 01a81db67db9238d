use anyhow::{Context, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::AssembledDocument;
use crate::error::{DispatchError, Result};

/// What the remote side returned for a published document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub remote_id: String,
}

/// Pushes an assembled document somewhere
#[allow(async_fn_in_trait)]
pub trait Publisher {
    /// Name reported in errors and logs
    fn name(&self) -> &str;

    async fn publish(&self, document: &AssembledDocument) -> anyhow::Result<PublishReceipt>;
}

/// Configuration for the webhook publisher
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint receiving the document (DISPATCH_PUBLISH_URL)
    pub url: String,
    /// Optional bearer token (DISPATCH_PUBLISH_TOKEN)
    pub token: Option<String>,
}

impl WebhookConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let url = std::env::var("DISPATCH_PUBLISH_URL")
            .context("DISPATCH_PUBLISH_URL environment variable not set")?;
        let token = std::env::var("DISPATCH_PUBLISH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(Self { url, token })
    }
}

/// POSTs `{subject, preview_text, html}` as JSON and reads back `{id}`
pub struct WebhookPublisher {
    client: Client,
    config: WebhookConfig,
}

impl WebhookPublisher {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    subject: &'a str,
    preview_text: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    id: serde_json::Value,
}

impl Publisher for WebhookPublisher {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn publish(&self, document: &AssembledDocument) -> anyhow::Result<PublishReceipt> {
        let body = PublishRequest {
            subject: &document.subject,
            preview_text: &document.preview_text,
            html: &document.html,
        };

        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send document to publish endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Publish endpoint error: {} - {}", status, body);
        }

        let response: PublishResponse = response
            .json()
            .await
            .context("Failed to parse publish endpoint response")?;

        Ok(PublishReceipt {
            remote_id: remote_id(&response.id)?,
        })
    }
}

/// Ids come back as strings or numbers depending on the endpoint
fn remote_id(id: &serde_json::Value) -> anyhow::Result<String> {
    match id {
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => bail!("Publish endpoint returned an unusable id: {}", other),
    }
}

/// Publish `document`, mapping failures to [`DispatchError::Publish`]
pub async fn publish_document<P: Publisher>(
    publisher: &P,
    document: &AssembledDocument,
) -> Result<PublishReceipt> {
    let receipt = publisher
        .publish(document)
        .await
        .map_err(|e| DispatchError::Publish {
            collaborator: publisher.name().to_string(),
            message: format!("{:#}", e),
        })?;

    info!(
        "Published {:?} via {} (remote id {})",
        document.output_path,
        publisher.name(),
        receipt.remote_id
    );
    Ok(receipt)
}
