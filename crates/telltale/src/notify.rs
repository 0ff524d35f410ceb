//! Notification engine: fan-out of change-set updates to subscribers.
//!
//! State is a thread-local mapping from change-set identity to that set's
//! subscribers. Two delivery modes exist:
//!
//! - **push**: callbacks invoked synchronously, each with a snapshot of
//!   *all* paths currently in the change set (full cumulative dirty state
//!   since the last reset, never a diff);
//! - **pull**: a blocking, cancellable sequence of batches with a single
//!   pending slot: while the consumer lags, a newer batch overwrites the
//!   undelivered one (no unbounded buffering is offered, with or without
//!   coalescing).
//!
//! Callbacks are `Rc<dyn Fn>`, so a callback that mutates tracked state
//! re-enters the engine cleanly: the nested mutation runs its own
//! propagation and delivery cycle before the outer one resumes.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::changeset::{set_id, ChangeSet, ChangeSetRef};

type Callback = Rc<dyn Fn(&[String])>;

struct Subscribers {
    /// Validity check: registry entries are keyed by address, so an entry
    /// only counts while this weak still points at the same change set.
    target: Weak<RefCell<ChangeSet>>,
    next_push_id: u64,
    push: BTreeMap<u64, Callback>,
    pull: Vec<Arc<BatchSlot>>,
}

impl Subscribers {
    fn new(cs: &ChangeSetRef) -> Self {
        Self {
            target: Rc::downgrade(cs),
            next_push_id: 1,
            push: BTreeMap::new(),
            pull: Vec::new(),
        }
    }

    fn is_for(&self, cs: &ChangeSetRef) -> bool {
        self.target
            .upgrade()
            .is_some_and(|live| Rc::ptr_eq(&live, cs))
    }
}

thread_local! {
    static ENGINE: RefCell<HashMap<usize, Subscribers>> = RefCell::new(HashMap::new());
}

fn with_entry<R>(cs: &ChangeSetRef, f: impl FnOnce(&mut Subscribers) -> R) -> R {
    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        let entry = engine
            .entry(set_id(cs))
            .and_modify(|existing| {
                if !existing.is_for(cs) {
                    // The address was reused by a new change set; the old
                    // subscribers die with the old set.
                    *existing = Subscribers::new(cs);
                }
            })
            .or_insert_with(|| Subscribers::new(cs));
        f(entry)
    })
}

// ── Push mode ──────────────────────────────────────────────────────────────

/// Guard for one push callback registered against one or more change sets.
///
/// Dropping the guard does *not* unsubscribe (mirroring a dropped
/// unsubscribe function); call [`PushSubscription::unsubscribe`], which is
/// idempotent and safe to call from inside any callback invocation;
/// callbacks registered at the moment a delivery began still receive that
/// delivery.
pub struct PushSubscription {
    entries: Vec<(usize, u64)>,
}

impl PushSubscription {
    pub fn unsubscribe(&self) {
        ENGINE.with(|engine| {
            let mut engine = engine.borrow_mut();
            for (set, id) in &self.entries {
                if let Some(subs) = engine.get_mut(set) {
                    subs.push.remove(id);
                }
            }
        });
    }
}

pub(crate) fn subscribe_push(
    sets: &[ChangeSetRef],
    callback: impl Fn(&[String]) + 'static,
) -> PushSubscription {
    let callback: Callback = Rc::new(callback);
    let entries = sets
        .iter()
        .map(|cs| {
            let id = with_entry(cs, |subs| {
                let id = subs.next_push_id;
                subs.next_push_id += 1;
                subs.push.insert(id, Rc::clone(&callback));
                id
            });
            (set_id(cs), id)
        })
        .collect();
    PushSubscription { entries }
}

// ── Pull mode ──────────────────────────────────────────────────────────────

struct SlotState {
    pending: Option<Vec<String>>,
    cancelled: bool,
}

struct BatchSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl BatchSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pull-based sequence of dirty-path batches.
///
/// The consumer half is `Send`: it only touches the shared slot, so a
/// consumer thread can block in [`next`](Self::next) while the tracked
/// structure lives on the mutating thread.
pub struct PullSubscription {
    slot: Arc<BatchSlot>,
    coalesce: bool,
}

impl PullSubscription {
    /// The most recent undelivered batch, blocking until one arrives.
    /// `None` means the subscription was cancelled.
    pub fn next_batch(&self) -> Option<Vec<String>> {
        let mut state = self.slot.lock();
        loop {
            if let Some(batch) = state.pending.take() {
                return Some(batch);
            }
            if state.cancelled {
                return None;
            }
            state = self
                .slot
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Non-blocking variant of [`next_batch`](Self::next_batch).
    pub fn try_next(&self) -> Option<Vec<String>> {
        self.slot.lock().pending.take()
    }

    /// Cancel the sequence: idempotent, unregisters the subscription and
    /// wakes any blocked [`next_batch`](Self::next_batch) with termination.
    pub fn cancel(&self) {
        let mut state = self.slot.lock();
        state.cancelled = true;
        state.pending = None;
        self.slot.ready.notify_all();
    }

    /// Whether this subscription was opened with coalescing enabled. Both
    /// modes keep a single pending slot; the flag is surfaced for callers
    /// that branch on it.
    pub fn is_coalescing(&self) -> bool {
        self.coalesce
    }
}

impl Iterator for PullSubscription {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        self.next_batch()
    }
}

impl Drop for PullSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub(crate) fn subscribe_pull(sets: &[ChangeSetRef], coalesce: bool) -> PullSubscription {
    let slot = Arc::new(BatchSlot {
        state: Mutex::new(SlotState {
            pending: None,
            cancelled: false,
        }),
        ready: Condvar::new(),
    });
    for cs in sets {
        with_entry(cs, |subs| subs.pull.push(Arc::clone(&slot)));
    }
    PullSubscription { slot, coalesce }
}

// ── Delivery ───────────────────────────────────────────────────────────────

/// Deliver one notification for `cs`: called once per affected change set
/// per logical mutation, after propagation has finished recording paths.
pub(crate) fn deliver(cs: &ChangeSetRef) {
    let snapshot: Vec<String> = cs.borrow().dirty_paths();

    // Snapshot the subscriber lists first and release the engine borrow:
    // callbacks may subscribe, unsubscribe or mutate tracked state, all of
    // which re-enter the engine.
    let (callbacks, slots) = ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        match engine.get_mut(&set_id(cs)) {
            Some(subs) if subs.is_for(cs) => {
                subs.pull
                    .retain(|slot| !slot.lock().cancelled);
                (
                    subs.push.values().cloned().collect::<Vec<Callback>>(),
                    subs.pull.clone(),
                )
            }
            _ => (Vec::new(), Vec::new()),
        }
    });

    // Pull slots are filled before push callbacks run, so a nested
    // mutation inside a callback overwrites with a *newer* batch rather
    // than the other way around.
    for slot in &slots {
        let mut state = slot.lock();
        if !state.cancelled {
            state.pending = Some(snapshot.clone());
            slot.ready.notify_all();
        }
    }

    for callback in &callbacks {
        callback(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset;

    #[test]
    fn push_delivers_cumulative_snapshot() {
        let cs = changeset::new_ref();
        let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let sub = subscribe_push(std::slice::from_ref(&cs), move |paths| {
            seen_clone.borrow_mut().push(paths.to_vec());
        });
        cs.borrow_mut().insert("a.b".into());
        cs.borrow_mut().insert("a".into());
        deliver(&cs);
        cs.borrow_mut().insert("c".into());
        deliver(&cs);
        let seen = seen.borrow();
        assert_eq!(seen[0], vec!["a.b", "a"]);
        assert_eq!(seen[1], vec!["a.b", "a", "c"]);
        sub.unsubscribe();
    }

    #[test]
    fn unsubscribe_stops_future_deliveries() {
        let cs = changeset::new_ref();
        let count = Rc::new(RefCell::new(0usize));
        let count_clone = Rc::clone(&count);
        let sub = subscribe_push(std::slice::from_ref(&cs), move |_| {
            *count_clone.borrow_mut() += 1;
        });
        cs.borrow_mut().insert("x".into());
        deliver(&cs);
        sub.unsubscribe();
        sub.unsubscribe(); // idempotent
        deliver(&cs);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn pull_slot_keeps_latest_batch_only() {
        let cs = changeset::new_ref();
        let sub = subscribe_pull(std::slice::from_ref(&cs), true);
        cs.borrow_mut().insert("a".into());
        deliver(&cs);
        cs.borrow_mut().insert("b".into());
        deliver(&cs);
        // Two deliveries, one undrained slot: only the latest survives.
        assert_eq!(sub.try_next(), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn cancelled_pull_terminates() {
        let cs = changeset::new_ref();
        let sub = subscribe_pull(std::slice::from_ref(&cs), false);
        sub.cancel();
        sub.cancel(); // idempotent
        assert_eq!(sub.next_batch(), None);
        cs.borrow_mut().insert("a".into());
        deliver(&cs);
        assert_eq!(sub.try_next(), None);
    }
}
