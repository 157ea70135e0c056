use corotrace_types::id::{CallSiteId, ResumptionId};
use log::warn;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::continuation::Continuation;
use crate::event::ResumptionPhase;
use crate::manager::StacksManager;

// injected code only has static calls to work with, so they land on one process-wide engine
static ENGINE: OnceCell<Arc<StacksManager<u64>>> = OnceCell::new();

/// Installs the engine the exported hooks forward to. Only the first install wins; a rejected
/// engine is handed back.
pub fn install(engine: Arc<StacksManager<u64>>) -> Result<&'static Arc<StacksManager<u64>>, Arc<StacksManager<u64>>> {
    ENGINE.try_insert(engine).map_err(|(_, rejected)| rejected)
}

pub fn installed() -> Option<&'static Arc<StacksManager<u64>>> {
    ENGINE.get()
}

/// Context handle as passed through the C ABI.
#[derive(Debug, Clone, Copy)]
pub struct RawContinuation(pub u64);

impl Continuation for RawContinuation {
    type Context = u64;

    fn context(&self) -> u64 {
        self.0
    }
}

#[no_mangle]
pub extern "C" fn corotrace_after_suspend_call(suspended: bool, context: u64, call_site: u32) {
    match installed() {
        Some(engine) => engine.after_suspend_call(&suspended, &RawContinuation(context), CallSiteId::from_raw(call_site)),
        None => warn!("afterSuspendCall at call site {} before an engine was installed", call_site),
    }
}

#[no_mangle]
pub extern "C" fn corotrace_do_resume_enter(context: u64, resumption: u32) {
    do_resume(context, resumption, ResumptionPhase::Entered);
}

#[no_mangle]
pub extern "C" fn corotrace_do_resume_exit(context: u64, resumption: u32) {
    do_resume(context, resumption, ResumptionPhase::Exited);
}

fn do_resume(context: u64, resumption: u32, phase: ResumptionPhase) {
    match installed() {
        Some(engine) => engine.handle_do_resume(&RawContinuation(context), ResumptionId::from_raw(resumption), phase),
        None => warn!("doResume {:?} before an engine was installed", phase),
    }
}
