use crate::signaling::signaling_channel::SignalingChannel;
use async_trait::async_trait;
use castroom_core::{SignalEvent, StudioError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// One serialized event on its way to the socket.
#[derive(Debug)]
pub struct OutboundFrame {
    pub text: String,
    ack: Option<oneshot::Sender<Result<Value, String>>>,
}

impl OutboundFrame {
    /// Event name from the frame, if it is well formed.
    pub fn event(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.text).ok()?;
        value.get("event")?.as_str().map(str::to_owned)
    }

    pub fn wants_ack(&self) -> bool {
        self.ack.is_some()
    }

    /// Complete the ack callback. No-op for frames emitted without one.
    pub fn acknowledge(self, result: Result<Value, String>) {
        if let Some(ack) = self.ack {
            let _ = ack.send(result);
        }
    }
}

/// [`SignalingChannel`] that hands JSON frames to whatever owns the socket.
#[derive(Clone)]
pub struct SocketBridge {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl SocketBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send_frame(
        &self,
        event: &SignalEvent,
        ack: Option<oneshot::Sender<Result<Value, String>>>,
    ) -> Result<(), StudioError> {
        let text = event.to_json()?;
        debug!("Emitting {}", event.name());

        self.tx
            .send(OutboundFrame { text, ack })
            .map_err(|_| {
                error!("Socket closed, dropping '{}'", event.name());
                StudioError::Signaling("socket channel closed".into())
            })
    }
}

#[async_trait]
impl SignalingChannel for SocketBridge {
    async fn emit(&self, event: SignalEvent) -> Result<(), StudioError> {
        self.send_frame(&event, None)
    }

    async fn emit_with_ack(&self, event: SignalEvent) -> Result<Value, StudioError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send_frame(&event, Some(ack_tx))?;

        match ack_rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(StudioError::Signaling(reason)),
            Err(_) => Err(StudioError::Signaling(format!(
                "'{}' was dropped before it was acknowledged",
                event.name()
            ))),
        }
    }
}
