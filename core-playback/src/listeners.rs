//! Listener lists that tolerate mutation while they are being fired.
//!
//! [`DeferredList`] snapshots its entries when a fire pass starts and hands
//! each entry to the caller without holding any lock, so an entry may add or
//! remove entries (including itself) from inside its own invocation. Such
//! mutations are queued and applied when the outermost pass returns:
//!
//! - an entry added during a pass is first invoked by the next pass;
//! - an entry removed during a pass is skipped for the rest of that pass;
//! - no queued mutation is lost, even when passes nest.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle identifying a registered listener or callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

enum Mutation<T> {
    Add(ListenerId, T),
    Remove(ListenerId),
}

struct ListState<T> {
    entries: Vec<(ListenerId, T)>,
    /// Number of fire passes currently running (passes may nest).
    firing: usize,
    queued: Vec<Mutation<T>>,
    /// Removed while firing; skipped by every running pass.
    cancelled: HashSet<ListenerId>,
}

impl<T> ListState<T> {
    fn apply_queued(&mut self) {
        for mutation in std::mem::take(&mut self.queued) {
            match mutation {
                Mutation::Add(id, item) => self.entries.push((id, item)),
                Mutation::Remove(id) => self.entries.retain(|(entry, _)| *entry != id),
            }
        }
        self.cancelled.clear();
    }

    fn contains(&self, id: ListenerId) -> bool {
        let registered = self.entries.iter().any(|(entry, _)| *entry == id)
            || self
                .queued
                .iter()
                .any(|m| matches!(m, Mutation::Add(entry, _) if *entry == id));
        registered && !self.cancelled.contains(&id)
    }
}

/// Ordered list with snapshot-then-apply-deferred mutation semantics.
pub struct DeferredList<T> {
    state: Mutex<ListState<T>>,
}

impl<T> Default for DeferredList<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ListState {
                entries: Vec::new(),
                firing: 0,
                queued: Vec::new(),
                cancelled: HashSet::new(),
            }),
        }
    }
}

impl<T> fmt::Debug for DeferredList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeferredList")
            .field("entries", &state.entries.len())
            .field("firing", &state.firing)
            .field("queued", &state.queued.len())
            .finish()
    }
}

/// Ends a fire pass even if an entry panics.
struct PassGuard<'a, T> {
    list: &'a DeferredList<T>,
}

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.list.state.lock();
        state.firing -= 1;
        if state.firing == 0 {
            state.apply_queued();
        }
    }
}

impl<T: Clone> DeferredList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item`. Takes effect after the running pass, if any.
    pub fn add(&self, item: T) -> ListenerId {
        let id = ListenerId::next();
        let mut state = self.state.lock();
        if state.firing > 0 {
            state.queued.push(Mutation::Add(id, item));
        } else {
            state.entries.push((id, item));
        }
        id
    }

    /// Unregister `id`. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        if !state.contains(id) {
            return false;
        }
        if state.firing > 0 {
            state.cancelled.insert(id);
            state.queued.push(Mutation::Remove(id));
        } else {
            state.entries.retain(|(entry, _)| *entry != id);
        }
        true
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.state.lock().contains(id)
    }

    /// Number of entries, counting queued additions and removals.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        let added = state
            .queued
            .iter()
            .filter(|m| matches!(m, Mutation::Add(..)))
            .count();
        state.entries.len() + added - state.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_firing(&self) -> bool {
        self.state.lock().firing > 0
    }

    /// Invoke `f` on every entry registered when the pass starts.
    ///
    /// Entries removed during the pass are skipped once their removal is
    /// requested. Returns how many entries were invoked.
    pub fn for_each<F>(&self, mut f: F) -> usize
    where
        F: FnMut(ListenerId, &T),
    {
        let snapshot = {
            let mut state = self.state.lock();
            state.firing += 1;
            state.entries.clone()
        };
        let _pass = PassGuard { list: self };

        let mut invoked = 0;
        for (id, item) in &snapshot {
            if self.state.lock().cancelled.contains(id) {
                continue;
            }
            f(*id, item);
            invoked += 1;
        }
        invoked
    }

    /// Remove every entry for which `keep` returns `false`.
    ///
    /// While a pass is running the removals are queued like [`remove`].
    ///
    /// [`remove`]: DeferredList::remove
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let doomed: Vec<ListenerId> = {
            let state = self.state.lock();
            state
                .entries
                .iter()
                .filter(|(_, item)| !keep(item))
                .map(|(id, _)| *id)
                .collect()
        };
        doomed.into_iter().filter(|id| self.remove(*id)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    #[derive(Clone)]
    struct Entry(Arc<dyn Fn(&DeferredList<Entry>) + Send + Sync>);

    impl Entry {
        fn new(f: impl Fn(&DeferredList<Entry>) + Send + Sync + 'static) -> Self {
            Self(Arc::new(f))
        }
    }

    fn entry(log: &Log, name: &'static str) -> Entry {
        let log = log.clone();
        Entry::new(move |_| log.lock().push(name))
    }

    fn fire(list: &DeferredList<Entry>) -> usize {
        list.for_each(|_, item| (item.0)(list))
    }

    #[test]
    fn fires_in_registration_order() {
        let log: Log = Arc::default();
        let list = DeferredList::new();
        list.add(entry(&log, "a"));
        list.add(entry(&log, "b"));

        assert_eq!(fire(&list), 2);
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn add_during_pass_is_deferred_to_next_pass() {
        let log: Log = Arc::default();
        let list: DeferredList<Entry> = DeferredList::new();

        let late = entry(&log, "late");
        let adder_log = log.clone();
        let added = Arc::new(Mutex::new(false));
        let flag = added.clone();
        list.add(Entry::new(move |list: &DeferredList<Entry>| {
            adder_log.lock().push("adder");
            let mut flag = flag.lock();
            if !*flag {
                *flag = true;
                list.add(late.clone());
            }
        }));

        fire(&list);
        assert_eq!(*log.lock(), vec!["adder"]);
        assert_eq!(list.len(), 2);

        fire(&list);
        assert_eq!(*log.lock(), vec!["adder", "adder", "late"]);
        assert!(*added.lock());
    }

    #[test]
    fn remove_during_pass_skips_the_rest_of_the_pass() {
        let log: Log = Arc::default();
        let list: DeferredList<Entry> = DeferredList::new();
        let victim_id = Arc::new(Mutex::new(None));

        let remover_log = log.clone();
        let target = victim_id.clone();
        list.add(Entry::new(move |list: &DeferredList<Entry>| {
            remover_log.lock().push("remover");
            if let Some(id) = *target.lock() {
                assert!(list.remove(id));
            }
        }));
        let victim = list.add(entry(&log, "victim"));
        list.add(entry(&log, "bystander"));
        *victim_id.lock() = Some(victim);

        fire(&list);
        assert_eq!(*log.lock(), vec!["remover", "bystander"]);
        assert!(!list.contains(victim));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn removing_twice_reports_false() {
        let list: DeferredList<u32> = DeferredList::new();
        let id = list.add(1);
        assert!(list.remove(id));
        assert!(!list.remove(id));
        assert!(list.is_empty());
    }

    #[test]
    fn nested_passes_apply_mutations_once_outermost_returns() {
        let list: DeferredList<u32> = DeferredList::new();
        list.add(1);

        list.for_each(|_, _| {
            list.add(2);
            list.for_each(|_, _| {
                assert!(list.is_firing());
            });
            assert!(list.is_firing());
        });

        assert!(!list.is_firing());
        let mut seen = Vec::new();
        list.for_each(|_, value| seen.push(*value));
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn retain_prunes_entries() {
        let list: DeferredList<u32> = DeferredList::new();
        list.add(1);
        list.add(2);
        list.add(3);

        assert_eq!(list.retain(|value| value % 2 == 1), 1);
        let mut seen = Vec::new();
        list.for_each(|_, value| seen.push(*value));
        assert_eq!(seen, vec![1, 3]);
    }

    #[test]
    fn panicking_entry_still_ends_the_pass() {
        let list: DeferredList<u32> = DeferredList::new();
        list.add(1);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            list.for_each(|_, _| {
                list.add(2);
                panic!("listener failed");
            });
        }));

        assert!(outcome.is_err());
        assert!(!list.is_firing());
        assert_eq!(list.len(), 2);
    }
}
