use corotrace_types::id::{CallSiteId, ResumptionId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResumptionPhase {
    Entered,
    Exited,
}

/// The hook event that caused a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StackEvent {
    Suspended(CallSiteId),
    Resumed(ResumptionId),
    Exited(ResumptionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StackChangedEvent {
    Created,
    Updated,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackChange {
    pub kind: StackChangedEvent,
    pub cause: StackEvent,
}
