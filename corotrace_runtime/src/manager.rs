use corotrace_types::id::{CallSiteId, ResumptionId};
use corotrace_types::registry::Registries;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, warn};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::continuation::{Continuation, SuspendOutcome};
use crate::event::{ResumptionPhase, StackChange, StackChangedEvent, StackEvent};
use crate::stack::{FramePolicy, LogicalStack};

/// Identity of a logical coroutine.
pub trait ContextKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> ContextKey for T {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub frame_policy: FramePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<C> = Arc<dyn Fn(&StackChange, &C) + Send + Sync>;

#[derive(Debug, Default)]
struct ContextSlot {
    // held for a whole event, notifications included, to keep per-context ordering.
    // true once the slot has been dropped from the map
    removed: Mutex<bool>,
    // held only while mutating, so callbacks can still read stacks
    stack: RwLock<LogicalStack>,
}

/// Runtime half: turns hook events into one logical stack per coroutine context.
pub struct StacksManager<C: ContextKey> {
    registries: Arc<Registries>,
    config: EngineConfig,
    stacks: DashMap<C, Arc<ContextSlot>>,
    subscribers: RwLock<Vec<(SubscriptionId, Callback<C>)>>,
    next_subscription: AtomicU64,
}

impl<C: ContextKey> StacksManager<C> {
    pub fn new(registries: Arc<Registries>, config: EngineConfig) -> Self {
        Self {
            registries,
            config,
            stacks: DashMap::new(),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn subscribe(&self, callback: impl Fn(&StackChange, &C) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn current_stacks(&self) -> Vec<(C, LogicalStack)> {
        self.stacks
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stack.read().clone()))
            .collect()
    }

    pub fn stack(&self, context: &C) -> Option<LogicalStack> {
        let slot = self.stacks.get(context)?.value().clone();
        let stack = slot.stack.read().clone();
        Some(stack)
    }

    /// Hook fired right after an instrumented suspend call returns to its caller.
    pub fn after_suspend_call<K, R>(&self, result: &R, continuation: &K, call_site: CallSiteId)
    where
        K: Continuation<Context = C> + ?Sized,
        R: SuspendOutcome + ?Sized,
    {
        guarded("after_suspend_call", || {
            let call = match self.registries.call(call_site) {
                Some(c) => c,
                None => {
                    error!("afterSuspendCall with unknown call site index {}", call_site.index());
                    return
                },
            };
            let suspended = result.is_suspended();
            debug!("suspend call of {}: {}", call, if suspended { "suspended" } else { "returned" });
            if !suspended {
                return
            }

            let context = continuation.context();
            let policy = self.config.frame_policy;
            self.apply(&context, true, StackEvent::Suspended(call_site), |stack| {
                stack.suspended_at(call_site, &call, policy);
                true
            });
        })
    }

    /// Hook fired on entry to, and for state machines on exit from, a resumption dispatcher.
    pub fn handle_do_resume<K>(&self, continuation: &K, resumption: ResumptionId, phase: ResumptionPhase)
    where
        K: Continuation<Context = C> + ?Sized,
    {
        guarded("handle_do_resume", || {
            let link = match self.registries.resumption(resumption) {
                Some(l) => l,
                None => {
                    error!("doResume {:?} with unknown resumption index {}", phase, resumption.index());
                    return
                },
            };
            let context = continuation.context();
            debug!("doResume {:?} ({}) for context {:?}", phase, link.do_resume, context);

            match phase {
                ResumptionPhase::Entered => {
                    self.apply(&context, true, StackEvent::Resumed(resumption), |stack| {
                        stack.resumed(resumption, &link);
                        true
                    });
                },
                ResumptionPhase::Exited => {
                    self.apply(&context, false, StackEvent::Exited(resumption), |stack| stack.exited(&link));
                },
            }
        })
    }

    fn apply(&self, context: &C, create: bool, cause: StackEvent, mutate: impl FnOnce(&mut LogicalStack) -> bool) {
        let mut mutate = Some(mutate);
        // a slot can be dropped from the map between lookup and locking; go round again if so
        loop {
            let (slot, created) = match self.stacks.entry(context.clone()) {
                Entry::Occupied(e) => (e.get().clone(), false),
                Entry::Vacant(e) if create => (e.insert(Arc::default()).value().clone(), true),
                Entry::Vacant(_) => {
                    warn!("{:?} for context {:?} with no stack", cause, context);
                    return
                },
            };

            let mut removed = slot.removed.lock();
            if *removed {
                continue
            }
            let mutate = match mutate.take() {
                Some(f) => f,
                None => return,
            };

            let (changed, empty) = {
                let mut stack = slot.stack.write();
                let changed = mutate(&mut stack);
                (changed, stack.is_empty())
            };

            let kind = if empty {
                *removed = true;
                self.stacks.remove_if(context, |_, s| Arc::ptr_eq(s, &slot));
                StackChangedEvent::Removed
            } else if created {
                StackChangedEvent::Created
            } else if changed {
                StackChangedEvent::Updated
            } else {
                return
            };

            self.notify(&StackChange { kind, cause }, context);
            return
        }
    }

    fn notify(&self, change: &StackChange, context: &C) {
        let subs: Vec<_> = self.subscribers.read().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in subs {
            if let Err(e) = panic::catch_unwind(AssertUnwindSafe(|| cb(change, context))) {
                error!("stack change callback failed for {:?} on {:?}: {}", change, context, panic_message(&*e));
            }
        }
    }
}

fn guarded(what: &str, f: impl FnOnce()) {
    if let Err(e) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!("{} failed: {}", what, panic_message(&*e));
    }
}

fn panic_message(e: &(dyn Any + Send)) -> String {
    if let Some(s) = e.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = e.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
