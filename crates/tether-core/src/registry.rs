//! Cross-connection bookkeeping boundary

use crate::attempt::AttemptId;

/// Process-wide registry told about every closed attempt
///
/// Notifications are keyed by attempt identity and are sent whether or not
/// the attempt was still current for its reconciler.
pub trait AttemptRegistry: Send + Sync {
    fn notify_closed(&self, attempt: AttemptId);
}

/// Registry that ignores notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl AttemptRegistry for NoopRegistry {
    fn notify_closed(&self, _attempt: AttemptId) {}
}
