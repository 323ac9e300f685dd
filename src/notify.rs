//! User-facing notification sink.
//!
//! The loader never renders anything itself; it hands short notices to a
//! [`Notifier`] and moves on.

use std::fmt;

use tracing::{error, info};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::Info => f.write_str("info"),
            NoticeKind::Error => f.write_str("error"),
        }
    }
}

/// Fire-and-forget notice delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);

    fn error(&self, message: &str) {
        self.notify(NoticeKind::Error, message);
    }
}

/// Routes notices into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Info => info!(target: "playback::notice", "{message}"),
            NoticeKind::Error => error!(target: "playback::notice", "{message}"),
        }
    }
}
