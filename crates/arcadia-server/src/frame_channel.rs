use serde::Serialize;
use tokio::sync::broadcast;

use arcadia_core::messages::HostMessage;
use arcadia_core::sandbox::IsolatedContext;

/// Instruction for the browser-side iframe that hosts a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameCommand {
    /// Point the iframe at `src`.
    Navigate { src: String },
    /// Clear the iframe (`about:blank`).
    Blank,
    /// Relay `data` to the hosted document with `postMessage`.
    Message { data: HostMessage },
}

/// `IsolatedContext` backed by a broadcast channel streamed to the browser.
///
/// An attached stream subscriber is the context being ready. Commands sent
/// while nobody is subscribed are dropped; delivery order follows send order.
pub struct FrameChannel {
    session_id: String,
    tx: broadcast::Sender<FrameCommand>,
}

impl FrameChannel {
    pub fn new(session_id: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            session_id: session_id.into(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FrameCommand> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn send(&self, command: FrameCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!(
                session = %self.session_id,
                "No frame subscriber, command dropped"
            );
        }
    }
}

impl IsolatedContext for FrameChannel {
    fn navigate(&mut self, address: &str) {
        self.send(FrameCommand::Navigate {
            src: address.to_string(),
        });
    }

    fn blank(&mut self) {
        self.send(FrameCommand::Blank);
    }

    fn post_message(&self, message: &HostMessage) {
        self.send(FrameCommand::Message {
            data: message.clone(),
        });
    }
}
