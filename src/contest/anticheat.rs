// src/contest/anticheat.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectStart,
    Copy,
    Cut,
    Paste,
    ContextMenu,
    KeyDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    /// Key name for `KeyDown` ("c", "F12", ...).
    pub key: Option<String>,
    pub modifiers: Modifiers,
}

impl InputEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            key: None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self {
            kind: EventKind::KeyDown,
            key: Some(key.to_string()),
            modifiers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&InputEvent) -> Disposition + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, EventKind, Listener)>,
}

/// Document-level event target shared by every mounted view.
#[derive(Clone, Default)]
pub struct Document {
    listeners: Arc<Mutex<Listeners>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&InputEvent) -> Disposition + Send + Sync + 'static,
    {
        let mut listeners = self.lock();
        listeners.next_id += 1;
        let id = ListenerId(listeners.next_id);
        listeners.entries.push((id, kind, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry, _, _)| *entry != id);
        listeners.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Runs every listener for the event's kind. Any suppression wins.
    pub fn dispatch(&self, event: &InputEvent) -> Disposition {
        // Clone out so listeners run without the lock held.
        let matching: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind)
            .map(|(_, _, l)| Arc::clone(l))
            .collect();

        let mut outcome = Disposition::Allow;
        for listener in matching {
            if listener(event) == Disposition::Suppress {
                outcome = Disposition::Suppress;
            }
        }
        outcome
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(|p| p.into_inner())
    }
}

const GUARDED_KINDS: [EventKind; 6] = [
    EventKind::SelectStart,
    EventKind::Copy,
    EventKind::Cut,
    EventKind::Paste,
    EventKind::ContextMenu,
    EventKind::KeyDown,
];

/// Keyboard shortcuts blocked during a contest: clipboard, select-all, save, print,
/// view-source and the developer tools.
pub fn is_blocked_shortcut(event: &InputEvent) -> bool {
    let Some(key) = event.key.as_deref() else {
        return false;
    };
    if key.eq_ignore_ascii_case("F12") {
        return true;
    }

    let m = event.modifiers;
    if !(m.ctrl || m.meta) {
        return false;
    }
    let key = key.to_ascii_lowercase();
    if m.shift && matches!(key.as_str(), "i" | "j" | "c") {
        return true;
    }
    matches!(key.as_str(), "c" | "v" | "x" | "a" | "s" | "p" | "u")
}

fn should_suppress(event: &InputEvent) -> bool {
    match event.kind {
        EventKind::KeyDown => is_blocked_shortcut(event),
        _ => true,
    }
}

/// Input suppression for the lifetime of a contest view.
///
/// Listeners go in on [`AntiCheatGuard::install`] and come out on drop, whichever way
/// the view is left.
pub struct AntiCheatGuard {
    document: Document,
    ids: Vec<ListenerId>,
    blocked: Arc<AtomicUsize>,
}

impl AntiCheatGuard {
    pub fn install(document: &Document) -> Self {
        let blocked = Arc::new(AtomicUsize::new(0));
        let ids = GUARDED_KINDS
            .iter()
            .map(|&kind| {
                let blocked = Arc::clone(&blocked);
                document.add_listener(kind, move |event| {
                    if should_suppress(event) {
                        blocked.fetch_add(1, Ordering::Relaxed);
                        Disposition::Suppress
                    } else {
                        Disposition::Allow
                    }
                })
            })
            .collect();

        tracing::debug!("Anti-cheat listeners installed");
        Self {
            document: document.clone(),
            ids,
            blocked,
        }
    }

    /// Events suppressed so far.
    pub fn blocked_count(&self) -> usize {
        self.blocked.load(Ordering::Relaxed)
    }
}

impl Drop for AntiCheatGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.document.remove_listener(id);
        }
        tracing::debug!(
            "Anti-cheat listeners removed after blocking {} events",
            self.blocked_count()
        );
    }
}
