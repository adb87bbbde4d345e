//! Workspace context change events and the listener hub that fans them out.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::tenant::{ClientId, PlanTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
    ListenerId(LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Why a selection was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearReason {
    /// The user asked to switch organization.
    SwitchOrganization,
    /// The backend answered forbidden / not found for the selected tenant.
    AuthorizationFailure,
    SignedOut,
}

/// Changes to the workspace context, delivered after the write happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    ClientSelected(ClientId),
    PlanSynced {
        client_id: ClientId,
        plan_tier: Option<PlanTier>,
        user_role: Option<String>,
    },
    Cleared(ClearReason),
}

pub type ContextListener = Arc<dyn Fn(&ContextEvent) + Send + Sync>;

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    listener: ContextListener,
}

/// Synchronous listener registry for [`ContextEvent`]s.
///
/// The store emits from a snapshot of the listener list, so listeners may
/// register or unregister (or read the store) while being called.
#[derive(Default)]
pub struct ContextEventHub {
    listeners: Vec<ListenerEntry>,
}

impl ContextEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, listener: ContextListener) -> ListenerId {
        let id = next_listener_id();
        self.listeners.push(ListenerEntry { id, listener });
        id
    }

    /// Returns false when `id` was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<ContextListener> {
        self.listeners.iter().map(|l| Arc::clone(&l.listener)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn on_off_and_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hub = ContextEventHub::new();

        let sink = Arc::clone(&seen);
        let id = hub.on(Arc::new(move |e: &ContextEvent| sink.lock().unwrap().push(e.clone())));
        assert_eq!(hub.len(), 1);

        for l in hub.snapshot() {
            l(&ContextEvent::Cleared(ClearReason::SignedOut));
        }
        assert_eq!(seen.lock().unwrap().len(), 1);

        assert!(hub.off(id));
        assert!(!hub.off(id));
        assert!(hub.is_empty());
    }
}
