// # Notification Lifecycle
//
// The single, process-wide transient notification ("toast").
//
// ## Semantics
//
// - `notify` replaces whatever is displayed and schedules a dismiss
// - Only the dismiss belonging to the most recent `notify` has any effect
// - Dismiss hides the notification and resets message/kind to defaults
//
// State is published through a `tokio::sync::watch` channel so the rendering
// layer can either poll `current()` or follow `subscribe()`.
//
// ## Runtime
//
// `notify` spawns the dismiss timer on the current Tokio runtime and must be
// called from within one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

/// Visual intent of a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotificationKind {
    #[default]
    Success,
    Error,
}

/// What the rendering layer shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub visible: bool,
    pub message: String,
    pub kind: NotificationKind,
    /// When the notification was displayed; `None` while hidden
    pub shown_at: Option<DateTime<Utc>>,
}

impl Notification {
    fn shown(message: String, kind: NotificationKind) -> Self {
        Self {
            visible: true,
            message,
            kind,
            shown_at: Some(Utc::now()),
        }
    }
}

struct NotifierInner {
    tx: watch::Sender<Notification>,
    /// Bumped by every `notify`; read and written only while the watch
    /// value is locked so a timer can never dismiss a newer notification.
    generation: AtomicU64,
    dismiss_after: Duration,
}

/// Owner of the process-wide notification
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("current", &*self.inner.tx.borrow())
            .field("dismiss_after", &self.inner.dismiss_after)
            .finish()
    }
}

impl Notifier {
    /// Create a hidden notifier that auto-dismisses after `dismiss_after`
    pub fn new(dismiss_after: Duration) -> Self {
        let (tx, _rx) = watch::channel(Notification::default());
        Self {
            inner: Arc::new(NotifierInner {
                tx,
                generation: AtomicU64::new(0),
                dismiss_after,
            }),
        }
    }

    pub fn dismiss_after(&self) -> Duration {
        self.inner.dismiss_after
    }

    /// Display a notification, replacing the current one
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        let mut generation = 0;

        self.inner.tx.send_modify(|current| {
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *current = Notification::shown(message, kind);
        });
        debug!("Notification {} shown ({:?})", generation, kind);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.dismiss_after).await;
            inner.dismiss_generation(generation);
        });
    }

    /// Hide the current notification immediately
    pub fn dismiss(&self) {
        self.inner.tx.send_if_modified(|current| {
            if !current.visible {
                return false;
            }
            *current = Notification::default();
            true
        });
    }

    /// Snapshot of the current notification
    pub fn current(&self) -> Notification {
        self.inner.tx.borrow().clone()
    }

    /// Stream of notification states, starting with the current one
    pub fn subscribe(&self) -> WatchStream<Notification> {
        WatchStream::new(self.inner.tx.subscribe())
    }
}

impl NotifierInner {
    fn dismiss_generation(&self, generation: u64) {
        let dismissed = self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation || !current.visible {
                return false;
            }
            *current = Notification::default();
            true
        });

        if dismissed {
            debug!("Notification {} auto-dismissed", generation);
        }
    }
}
