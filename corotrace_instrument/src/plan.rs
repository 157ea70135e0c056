use corotrace_ir::id::InsnIdx;
use corotrace_types::id::{CallSiteId, ResumptionId};
use corotrace_types::method::MethodId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    MethodStart,
    Before(InsnIdx),
    After(InsnIdx),
}

/// A hook call to insert. `context_slot` is the local variable holding the continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    AfterSuspendCall { call_site: CallSiteId, context_slot: usize },
    ResumptionEnter { resumption: ResumptionId, context_slot: usize },
    ResumptionExit { resumption: ResumptionId, context_slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRequest {
    pub placement: Placement,
    pub hook: Hook,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPlan {
    pub method: MethodId,
    pub context_slot: usize,
    pub hooks: Vec<HookRequest>,
}

impl MethodPlan {
    pub fn call_sites(&self) -> impl Iterator<Item = CallSiteId> + '_ {
        self.hooks.iter().filter_map(|h| match h.hook {
            Hook::AfterSuspendCall { call_site, .. } => Some(call_site),
            _ => None,
        })
    }

    pub fn resumption(&self) -> Option<ResumptionId> {
        self.hooks.iter().find_map(|h| match h.hook {
            Hook::ResumptionEnter { resumption, .. } => Some(resumption),
            _ => None,
        })
    }
}
