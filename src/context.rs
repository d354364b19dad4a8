//! Ambient request context: namespace, metadata, cancellation.
//!
//! A [`Context`] travels with every cache call. It carries an optional
//! namespace that partitions entry visibility, a free-form metadata map,
//! and a cancellation signal that long operations poll. Carriers are
//! immutable: each `with_*` constructor returns a new context and leaves
//! the receiver untouched, so a context can be shared across threads and
//! branched per call site.
//!
//! # Examples
//!
//! ```rust
//! use simcache::Context;
//!
//! let root = Context::background();
//! let tenant = root.with_namespace("tenant-a");
//! assert_eq!(tenant.namespace(), "tenant-a");
//! assert_eq!(root.namespace(), "");
//!
//! let (ctx, handle) = tenant.with_cancel();
//! assert!(!ctx.is_cancelled());
//! handle.cancel();
//! assert!(ctx.is_cancelled());
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Opaque metadata value carried by a [`Context`].
pub type MetadataValue = Arc<dyn Any + Send + Sync>;

/// Metadata map attached to a [`Context`] and snapshotted onto entries at
/// creation time.
pub type MetadataMap = FxHashMap<String, MetadataValue>;

/// One node in a cancellation chain. A derived context observes its own
/// flag, its own deadline, and every ancestor's.
struct CancelNode {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Arc<CancelNode>>,
}

impl CancelNode {
    fn is_done(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        match &self.parent {
            Some(parent) => parent.is_done(),
            None => false,
        }
    }
}

/// Handle that cancels the [`Context`] it was created with, and every
/// context derived from it.
#[derive(Clone)]
pub struct CancelHandle {
    node: Arc<CancelNode>,
}

impl CancelHandle {
    /// Raises the cancellation signal. Idempotent.
    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::Release);
    }
}

/// Ambient carrier for per-call cache state.
///
/// Cheap to clone: the namespace, metadata map and cancellation state are
/// all reference-counted. The cache never mutates a context.
#[derive(Clone, Default)]
pub struct Context {
    namespace: Option<Arc<str>>,
    metadata: Option<Arc<MetadataMap>>,
    cancel: Option<Arc<CancelNode>>,
}

impl Context {
    /// Returns the root context: no namespace, no metadata, never
    /// cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a new context tagged with `namespace`.
    ///
    /// Entries created under a namespace are only visible to lookups
    /// carrying the same namespace. The empty string means "global".
    pub fn with_namespace(&self, namespace: impl Into<Arc<str>>) -> Self {
        let mut ctx = self.clone();
        ctx.namespace = Some(namespace.into());
        ctx
    }

    /// The namespace this context carries, or `""` if unset.
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// Returns a new context whose metadata map additionally holds
    /// `key → value`. The receiver's map is unchanged.
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Any + Send + Sync) -> Self {
        let mut map = self.metadata.as_deref().cloned().unwrap_or_default();
        map.insert(key.into(), Arc::new(value));
        let mut ctx = self.clone();
        ctx.metadata = Some(Arc::new(map));
        ctx
    }

    /// Looks up a metadata value by key.
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        self.metadata.as_ref()?.get(key).cloned()
    }

    /// Shared snapshot of the full metadata map (empty if none was set).
    pub(crate) fn metadata_map(&self) -> Arc<MetadataMap> {
        self.metadata.clone().unwrap_or_default()
    }

    /// Returns a derived context plus a handle that cancels it.
    ///
    /// Cancelling a parent also cancels every derived context.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        self.derive_cancel(None)
    }

    /// Returns a derived context that is cancelled automatically once
    /// `deadline` passes, plus a handle for cancelling it earlier.
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        self.derive_cancel(Some(deadline))
    }

    /// Returns a derived context that is cancelled automatically after
    /// `timeout`, plus a handle for cancelling it earlier.
    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether this context (or any ancestor) has been cancelled or has
    /// passed its deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|node| node.is_done())
    }

    fn derive_cancel(&self, deadline: Option<Instant>) -> (Self, CancelHandle) {
        let node = Arc::new(CancelNode {
            cancelled: AtomicBool::new(false),
            deadline,
            parent: self.cancel.clone(),
        });
        let mut ctx = self.clone();
        ctx.cancel = Some(Arc::clone(&node));
        (ctx, CancelHandle { node })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn background_has_no_namespace() {
        let ctx = Context::background();
        assert_eq!(ctx.namespace(), "");
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn with_namespace_leaves_parent_untouched() {
        let root = Context::background();
        let tagged = root.with_namespace("ns1");
        assert_eq!(tagged.namespace(), "ns1");
        assert_eq!(root.namespace(), "");
    }

    #[test]
    fn metadata_is_copy_on_write() {
        let root = Context::background();
        let ctx = root.with_metadata("user", "alice").with_metadata("role", "admin");

        assert!(root.metadata("user").is_none());

        let user = ctx.metadata("user").unwrap();
        assert_eq!(user.downcast_ref::<&str>(), Some(&"alice"));
        let role = ctx.metadata("role").unwrap();
        assert_eq!(role.downcast_ref::<&str>(), Some(&"admin"));
        assert!(ctx.metadata("missing").is_none());
    }

    #[test]
    fn cancel_propagates_to_derived_contexts() {
        let (parent, handle) = Context::background().with_cancel();
        let child = parent.with_namespace("child");
        let (grandchild, _child_handle) = child.with_cancel();

        assert!(!grandchild.is_cancelled());
        handle.cancel();
        assert!(parent.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn child_cancel_does_not_affect_parent() {
        let (parent, _parent_handle) = Context::background().with_cancel();
        let (child, child_handle) = parent.with_cancel();

        child_handle.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn deadline_cancels_after_timeout() {
        let (ctx, _handle) = Context::background().with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_cancelled());
        thread::sleep(Duration::from_millis(40));
        assert!(ctx.is_cancelled());
    }
}
