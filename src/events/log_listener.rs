use async_trait::async_trait;

use crate::events::{Listener, MembershipEvent};

/// Logs all membership events using the `log` crate.
///
/// # Example
///
/// ```rust,ignore
/// use trellis::register_event_listeners;
/// use trellis::events::LoggingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::with_level(log::Level::Debug));
/// });
/// ```
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Creates a new logging listener at INFO level.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    /// Creates a new logging listener at the specified level.
    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &MembershipEvent) {
        match event.scope() {
            Some(scope) => log::log!(
                target: "trellis::events",
                self.level,
                "msg=\"membership event\", event=\"{}\", scope=\"{scope}\", detail=\"{event:?}\"",
                event.name()
            ),
            None => log::log!(
                target: "trellis::events",
                self.level,
                "msg=\"membership event\", event=\"{}\", detail=\"{event:?}\"",
                event.name()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::ScopeKind;
    use chrono::Utc;

    #[test]
    fn test_logging_listener_levels() {
        assert_eq!(LoggingListener::default().level, log::Level::Info);
        assert_eq!(
            LoggingListener::with_level(log::Level::Warn).level,
            log::Level::Warn
        );
    }

    #[tokio::test]
    async fn test_logging_listener_handle() {
        let listener = LoggingListener::new();
        let event = MembershipEvent::MemberLeft {
            scope: ScopeKind::Project,
            scope_id: 1,
            member_id: 2,
            at: Utc::now(),
        };

        // should not panic
        listener.handle(&event).await;
    }
}
