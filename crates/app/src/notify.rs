//! Notification boundary
//!
//! Fire-and-forget user feedback. The controller never blocks on a
//! notification; the default sink is the log, and embedders plug in
//! their own toast surface by implementing [`Notifier`].

/// Notification severity, mirroring the usual toast levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Default sink: structured log records
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Info | NoticeKind::Success => {
                tracing::info!(target: "voxgate::notify", "{}", message)
            }
            NoticeKind::Warning => tracing::warn!(target: "voxgate::notify", "{}", message),
            NoticeKind::Error => tracing::error!(target: "voxgate::notify", "{}", message),
        }
    }
}
