use corotrace_types::registry::Registries;
use std::sync::Arc;

/// Owns the registries shared by every planner run in a process. Clones share state; hand one
/// to the runtime engine so hook indices resolve against the same tables.
#[derive(Debug, Clone, Default)]
pub struct InstrumentationSession {
    registries: Arc<Registries>,
}

impl InstrumentationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registries(registries: Arc<Registries>) -> Self {
        Self { registries }
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }
}
