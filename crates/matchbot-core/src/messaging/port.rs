use async_trait::async_trait;

use crate::Result;

/// Transport-side delivery port.
///
/// The console harness is the first implementation; an IRC or Discord
/// adapter fits behind the same two primitives with no core changes.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Deliver a private notice to a single user.
    async fn send_notice(&self, to: &str, text: &str) -> Result<()>;

    /// Deliver a public message to a channel.
    async fn send_message(&self, channel: &str, text: &str) -> Result<()>;
}
