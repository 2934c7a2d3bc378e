// ── Intent observers ──
//
// Policy modules that need to know *that* an entity's intent changed,
// not why, register here by name.

use tracing::debug;

/// Callback sink for intent changes. Both hooks default to no-ops so
/// implementors only override what they watch.
pub trait IntentObserver: Send {
    fn name(&self) -> &str;

    fn radio_changed(&mut self, _radio: &str) {}

    fn interface_changed(&mut self, _interface: &str) {}
}

/// Ordered list of registered observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Box<dyn IntentObserver>>,
}

impl ObserverRegistry {
    pub fn register(&mut self, observer: Box<dyn IntentObserver>) {
        debug!(observer = observer.name(), "intent observer registered");
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn notify_radio(&mut self, radio: &str) {
        for obs in &mut self.observers {
            obs.radio_changed(radio);
        }
    }

    pub(crate) fn notify_interface(&mut self, interface: &str) {
        for obs in &mut self.observers {
            obs.interface_changed(interface);
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}
