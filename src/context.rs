//! Immutable request-scoped context
//!
//! A [`LogContext`] is a persistent chain of nodes. Deriving a context adds one
//! node in front of the parent's chain and never changes the parent, so a
//! context can be shared across threads and handed down call chains freely.
//! Each node stores a single value under a scope token, which is the `TypeId`
//! of a caller-chosen key type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

struct ContextNode {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<ContextNode>>,
}

#[derive(Clone, Default)]
pub struct LogContext {
    head: Option<Arc<ContextNode>>,
}

impl LogContext {
    /// Empty root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives a child context carrying `value` under the key type `K`.
    pub fn with_value<K: 'static, V: Any + Send + Sync>(&self, value: Arc<V>) -> LogContext {
        LogContext {
            head: Some(Arc::new(ContextNode {
                key: TypeId::of::<K>(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    /// Nearest value stored under `K`, if it has type `V`.
    pub fn value<K: 'static, V: Any + Send + Sync>(&self) -> Option<Arc<V>> {
        let key = TypeId::of::<K>();
        let mut node = self.head.as_ref();
        while let Some(current) = node {
            if current.key == key {
                return current.value.clone().downcast::<V>().ok();
            }
            node = current.parent.as_ref();
        }
        None
    }

    /// Number of values in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_ref();
        while let Some(current) = node {
            depth += 1;
            node = current.parent.as_ref();
        }
        depth
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RequestId;
    struct Tenant;

    #[test]
    fn derived_context_leaves_parent_untouched() {
        let root = LogContext::new();
        let child = root.with_value::<RequestId, String>(Arc::new("req-1".into()));

        assert_eq!(root.depth(), 0);
        assert!(root.value::<RequestId, String>().is_none());
        assert_eq!(child.value::<RequestId, String>().unwrap().as_str(), "req-1");
    }

    #[test]
    fn nearest_value_shadows_ancestors() {
        let outer = LogContext::new().with_value::<RequestId, String>(Arc::new("outer".into()));
        let inner = outer
            .with_value::<Tenant, u32>(Arc::new(7))
            .with_value::<RequestId, String>(Arc::new("inner".into()));

        assert_eq!(inner.depth(), 3);
        assert_eq!(inner.value::<RequestId, String>().unwrap().as_str(), "inner");
        assert_eq!(*inner.value::<Tenant, u32>().unwrap(), 7);
        assert_eq!(outer.value::<RequestId, String>().unwrap().as_str(), "outer");
    }

    #[test]
    fn wrong_value_type_yields_none() {
        let ctx = LogContext::new().with_value::<Tenant, u32>(Arc::new(1));
        assert!(ctx.value::<Tenant, String>().is_none());
    }
}
