use async_trait::async_trait;
use castroom_client::SignalingChannel;
use castroom_core::{AnswerMessage, IceCandidateMessage, OfferMessage, SignalEvent, StudioError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// How `emit_with_ack` completes.
#[derive(Debug, Clone)]
pub enum AckMode {
    Ok(Value),
    Err(String),
    /// The ack callback never fires.
    Never,
}

/// Mock SignalingChannel that captures every emitted event.
#[derive(Clone)]
pub struct MockSignalingChannel {
    /// Channel to forward captured events.
    tx: mpsc::UnboundedSender<SignalEvent>,
    /// All captured events (for verification).
    events: Arc<Mutex<Vec<SignalEvent>>>,
    ack: Arc<Mutex<AckMode>>,
}

impl MockSignalingChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SignalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            events: Arc::new(Mutex::new(Vec::new())),
            ack: Arc::new(Mutex::new(AckMode::Ok(serde_json::json!({ "ok": true })))),
        };
        (signaling, rx)
    }

    pub async fn set_ack(&self, mode: AckMode) {
        *self.ack.lock().await = mode;
    }

    pub async fn events(&self) -> Vec<SignalEvent> {
        self.events.lock().await.clone()
    }

    pub async fn named(&self, name: &str) -> Vec<SignalEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    pub async fn offers(&self) -> Vec<OfferMessage> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                SignalEvent::Offer(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn answers(&self) -> Vec<AnswerMessage> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                SignalEvent::Answer(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn candidates(&self) -> Vec<IceCandidateMessage> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                SignalEvent::IceCandidate(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    async fn capture(&self, event: SignalEvent) {
        tracing::debug!("[MockSignaling] emit {}", event.name());
        self.events.lock().await.push(event.clone());
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl SignalingChannel for MockSignalingChannel {
    async fn emit(&self, event: SignalEvent) -> Result<(), StudioError> {
        self.capture(event).await;
        Ok(())
    }

    async fn emit_with_ack(&self, event: SignalEvent) -> Result<Value, StudioError> {
        self.capture(event).await;

        let mode = self.ack.lock().await.clone();
        match mode {
            AckMode::Ok(value) => Ok(value),
            AckMode::Err(reason) => Err(StudioError::Signaling(reason)),
            AckMode::Never => futures::future::pending().await,
        }
    }
}
