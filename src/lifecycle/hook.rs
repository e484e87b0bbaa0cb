//! Named lifecycle hooks and the live collections that hold them.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::lifecycle::context::Context;

/// Error returned by a hook or health check.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one hook invocation.
pub type HookResult = Result<(), HookError>;

/// A startup or shutdown hook.
#[derive(Clone)]
pub struct Hook(Arc<dyn Fn(Context) -> BoxFuture<'static, HookResult> + Send + Sync>);

impl Hook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self(Arc::new(move |ctx: Context| hook(ctx).boxed()))
    }

    pub fn call(&self, ctx: Context) -> BoxFuture<'static, HookResult> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// One entry of a [`HookSet`].
#[derive(Debug, Clone)]
pub struct NamedHook<H> {
    pub name: String,
    pub hook: H,
}

/// An insertion-ordered, name-unique collection of hooks.
///
/// Cloning a `HookSet` yields another handle onto the same collection, so
/// anything registered later is visible through every handle.
#[derive(Debug)]
pub struct HookSet<H> {
    entries: Arc<RwLock<Vec<NamedHook<H>>>>,
}

impl<H> Clone for HookSet<H> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<H> Default for HookSet<H> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<H: Clone> HookSet<H> {
    /// Store `hook` under `name`, replacing any entry with the same name in place.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub(crate) fn insert(&self, name: String, hook: H) -> bool {
        let mut entries = self.write();
        match entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.hook = hook;
                true
            }
            None => {
                entries.push(NamedHook { name, hook });
                false
            }
        }
    }

    /// Drop the entry named `name`. Returns `true` when one was present.
    pub(crate) fn remove(&self, name: &str) -> bool {
        let mut entries = self.write();
        match entries.iter().position(|entry| entry.name == name) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copy of the entries as they are right now, in registration order.
    pub fn snapshot(&self) -> Vec<NamedHook<H>> {
        self.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<H> {
        self.read()
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.hook.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panicking writer cannot leave the Vec half-updated, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Vec<NamedHook<H>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<NamedHook<H>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_keeps_original_slot() {
        let set: HookSet<u32> = HookSet::default();
        assert!(!set.insert("a".into(), 1));
        assert!(!set.insert("b".into(), 2));
        assert!(set.insert("a".into(), 3));

        assert_eq!(set.names(), vec!["a", "b"]);
        assert_eq!(set.get("a"), Some(3));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let set: HookSet<u32> = HookSet::default();
        set.insert("a".into(), 1);
        set.insert("b".into(), 2);
        set.insert("c".into(), 3);

        assert!(set.remove("b"));
        assert!(!set.remove("b"));
        assert_eq!(set.names(), vec!["a", "c"]);
    }

    #[test]
    fn handles_share_the_collection() {
        let set: HookSet<u32> = HookSet::default();
        let handle = set.clone();
        assert!(handle.is_empty());

        set.insert("late".into(), 9);
        assert_eq!(handle.get("late"), Some(9));
    }

    #[tokio::test]
    async fn hook_passes_context_through() {
        let hook = Hook::new(|ctx: Context| async move {
            if ctx.is_cancelled() {
                Err("cancelled".into())
            } else {
                Ok(())
            }
        });

        assert!(hook.call(Context::background()).await.is_ok());

        let ctx = Context::background();
        ctx.cancel();
        assert!(hook.call(ctx).await.is_err());
    }
}
