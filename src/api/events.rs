//! Post-action notification hooks.
//!
//! Every completed mutation (and folder read/seek) emits one event
//! after the transport work is done. Hooks run synchronously in
//! registration order and cannot veto the action — they observe it.
//! All paths in event payloads are relative.

/// What just happened, with the relative paths involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEvent {
    FolderRead {
        folder: String,
        entries: Vec<String>,
    },
    FolderSought {
        folder: String,
        query: String,
        matches: Vec<String>,
    },
    FolderCreated {
        folder: String,
    },
    ItemRenamed {
        old: String,
        new: String,
    },
    ItemCopied {
        source: String,
        new: String,
    },
    ItemMoved {
        source: String,
        new: String,
    },
}

impl ApiEvent {
    /// Stable dotted event name, usable as a dispatch key.
    pub fn name(&self) -> &'static str {
        match self {
            ApiEvent::FolderRead { .. } => "api.after.folder.read",
            ApiEvent::FolderSought { .. } => "api.after.folder.seek",
            ApiEvent::FolderCreated { .. } => "api.after.folder.create",
            ApiEvent::ItemRenamed { .. } => "api.after.item.rename",
            ApiEvent::ItemCopied { .. } => "api.after.item.copy",
            ApiEvent::ItemMoved { .. } => "api.after.item.move",
        }
    }
}

pub type EventHook = Box<dyn Fn(&ApiEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventHooks {
    hooks: Vec<EventHook>,
}

impl EventHooks {
    pub fn register(&mut self, hook: EventHook) {
        self.hooks.push(hook);
    }

    pub fn emit(&self, event: &ApiEvent) {
        log::debug!("dispatching {}", event.name());
        for hook in &self.hooks {
            hook(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn hooks_run_in_registration_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut hooks = EventHooks::default();
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hooks.register(Box::new(move |_| seen.lock().unwrap().push(tag)));
        }
        hooks.emit(&ApiEvent::FolderCreated {
            folder: "/new".to_string(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn every_hook_sees_every_event() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut hooks = EventHooks::default();
        let counter = Arc::clone(&count);
        hooks.register(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        hooks.emit(&ApiEvent::ItemRenamed {
            old: "/a.txt".to_string(),
            new: "/b.txt".to_string(),
        });
        hooks.emit(&ApiEvent::ItemMoved {
            source: "/b.txt".to_string(),
            new: "/sub/b.txt".to_string(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn event_names_are_dotted_and_stable() {
        let event = ApiEvent::FolderSought {
            folder: "/".to_string(),
            query: "report".to_string(),
            matches: vec![],
        };
        assert_eq!(event.name(), "api.after.folder.seek");
    }
}
