use async_trait::async_trait;
use castroom_core::{SignalEvent, StudioError};

/// Outbound half of the socket channel.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Fire-and-forget emit.
    async fn emit(&self, event: SignalEvent) -> Result<(), StudioError>;

    /// Emit and wait for the remote acknowledgement callback.
    async fn emit_with_ack(&self, event: SignalEvent) -> Result<serde_json::Value, StudioError>;
}
