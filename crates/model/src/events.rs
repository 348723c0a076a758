//! Synchronous model events.

use std::path::PathBuf;

use core_types::UserComment;

/// State change notifications emitted by [`crate::MediaModel`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// The listed directory changed.
    DirChanged(PathBuf),
    /// The selected media file changed (`None` clears the selection).
    MediaChanged(Option<PathBuf>),
    /// The set of listed files changed without the directory changing.
    DirContentChanged(PathBuf),
    /// The selected file was modified on disk.
    FileContentChanged(PathBuf),
    /// The comment of the selected media file was replaced.
    MediaCommentUpdated(UserComment),
    /// A new tag entered the tag database.
    TagAdded(String),
}

type Listener = Box<dyn FnMut(&ModelEvent)>;

/// Delivers events to subscribers in subscription order, on the caller's
/// thread, before the emitting call returns. Listeners must not mutate
/// the model re-entrantly.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ModelEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: &ModelEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for id in 0..3 {
            let log = Rc::clone(&log);
            bus.subscribe(move |_| log.borrow_mut().push(id));
        }
        bus.emit(&ModelEvent::TagAdded("beach".into()));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }
}
