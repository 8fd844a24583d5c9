use async_trait::async_trait;

use crate::events::{Listener, MembershipEvent};

/// Emits membership events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &MembershipEvent) {
        let scope = event.scope().map(|scope| scope.as_str());
        tracing::info!(
            target: "trellis::events",
            event_name = event.name(),
            scope,
            ?event,
            "membership event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_tracing_listener_handle() {
        let event = MembershipEvent::AccountDeleted {
            user_id: 1,
            at: Utc::now(),
        };

        // should not panic
        TracingListener.handle(&event).await;
    }
}
