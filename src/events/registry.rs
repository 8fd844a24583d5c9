use std::sync::OnceLock;

use async_trait::async_trait;

use super::MembershipEvent;
use crate::membership::ScopeKind;

static REGISTRY: OnceLock<EventRegistry> = OnceLock::new();

/// Receives membership events.
///
/// Listeners are awaited in registration order from inside the action that
/// fired the event, so keep them short.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn handle(&self, event: &MembershipEvent);
}

struct Subscription {
    /// `None` receives everything, account events included.
    scopes: Option<Vec<ScopeKind>>,
    listener: Box<dyn Listener>,
}

impl Subscription {
    fn wants(&self, event: &MembershipEvent) -> bool {
        match (&self.scopes, event.scope()) {
            (None, _) => true,
            (Some(scopes), Some(scope)) => scopes.contains(&scope),
            (Some(_), None) => false,
        }
    }
}

/// Listeners and the scopes each one follows.
///
/// Built once through [`register_event_listeners`].
#[derive(Default)]
pub struct EventRegistry {
    subscriptions: Vec<Subscription>,
}

impl EventRegistry {
    /// Subscribes `listener` to every event.
    pub fn listen(&mut self, listener: impl Listener) -> &mut Self {
        self.subscriptions.push(Subscription {
            scopes: None,
            listener: Box::new(listener),
        });
        self
    }

    /// Subscribes `listener` to events about the given kinds of scope only.
    ///
    /// Account deletions concern no single scope and are not delivered.
    pub fn listen_to(&mut self, scopes: &[ScopeKind], listener: impl Listener) -> &mut Self {
        self.subscriptions.push(Subscription {
            scopes: Some(scopes.to_vec()),
            listener: Box::new(listener),
        });
        self
    }

    fn listeners_for<'a>(
        &'a self,
        event: &'a MembershipEvent,
    ) -> impl Iterator<Item = &'a dyn Listener> + 'a {
        self.subscriptions
            .iter()
            .filter(move |s| s.wants(event))
            .map(|s| s.listener.as_ref())
    }

    async fn deliver(&self, event: &MembershipEvent) {
        for listener in self.listeners_for(event) {
            listener.handle(event).await;
        }
    }
}

/// Installs the process-wide listeners. Only the first call takes effect.
pub fn register_event_listeners<F>(f: F)
where
    F: FnOnce(&mut EventRegistry),
{
    let mut registry = EventRegistry::default();
    f(&mut registry);
    if REGISTRY.set(registry).is_err() {
        log::warn!(
            target: "trellis",
            "msg=\"event listeners already registered, ignoring\""
        );
    }
}

/// Hands `event` to every listener following its scope. No-op until
/// listeners are registered.
pub async fn dispatch(event: MembershipEvent) {
    if let Some(registry) = REGISTRY.get() {
        registry.deliver(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::*;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Listener for Counter {
        async fn handle(&self, _event: &MembershipEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn deleted(scope: ScopeKind) -> MembershipEvent {
        MembershipEvent::ScopeDeleted {
            scope,
            scope_id: 1,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_scoped_listeners_only_see_their_scopes() {
        let everything = Arc::new(AtomicUsize::new(0));
        let teams = Arc::new(AtomicUsize::new(0));
        let nested = Arc::new(AtomicUsize::new(0));

        let mut registry = EventRegistry::default();
        registry
            .listen(Counter(everything.clone()))
            .listen_to(&[ScopeKind::Team], Counter(teams.clone()))
            .listen_to(&[ScopeKind::Project, ScopeKind::Team], Counter(nested.clone()));

        registry.deliver(&deleted(ScopeKind::Team)).await;
        registry.deliver(&deleted(ScopeKind::Project)).await;
        registry.deliver(&deleted(ScopeKind::Workspace)).await;
        registry
            .deliver(&MembershipEvent::AccountDeleted {
                user_id: 3,
                at: Utc::now(),
            })
            .await;

        assert_eq!(everything.load(Ordering::SeqCst), 4);
        assert_eq!(teams.load(Ordering::SeqCst), 1);
        assert_eq!(nested.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_team_unassignment_counts_as_project_event() {
        let projects = Arc::new(AtomicUsize::new(0));
        let mut registry = EventRegistry::default();
        registry.listen_to(&[ScopeKind::Project], Counter(projects.clone()));

        registry
            .deliver(&MembershipEvent::TeamUnassigned {
                project_id: 1,
                team_id: 2,
                members_removed: 0,
                at: Utc::now(),
            })
            .await;

        assert_eq!(projects.load(Ordering::SeqCst), 1);
    }
}
