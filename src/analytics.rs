use serde::Serialize;
use tokio::sync::mpsc;
use url::Url;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub properties: serde_json::Value,
}

impl AnalyticsEvent {
    pub fn contract_deployed(chain_id: u64, contract_name: &str, contract_address: &str) -> Self {
        Self {
            event: "contract_deployed".to_string(),
            properties: serde_json::json!({
                "chainId": chain_id,
                "contractName": contract_name,
                "contractAddress": contract_address,
            }),
        }
    }
}

/// Best-effort event side-channel. Events go onto a bounded queue consumed
/// by a background poster; a full queue or a slow endpoint drops events, it
/// never delays the caller.
#[derive(Clone)]
pub struct Analytics {
    tx: Option<mpsc::Sender<AnalyticsEvent>>,
}

impl Analytics {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn start(client: reqwest::Client, endpoint: Url, queue_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AnalyticsEvent>(queue_size);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = client.post(endpoint.clone()).json(&event).send().await {
                    tracing::debug!(err = ?err, "analytics event dropped");
                }
            }
        });
        Self { tx: Some(tx) }
    }

    pub fn track(&self, event: AnalyticsEvent) {
        if let Some(tx) = &self.tx {
            if tx.try_send(event).is_err() {
                tracing::debug!("analytics queue full, event dropped");
            }
        }
    }
}
