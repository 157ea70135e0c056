use corotrace_ir::class::{CompiledMethod, Insn, InvokeInsn, InvokeKind};
use corotrace_ir::id::InsnIdx;
use std::convert::Infallible;

use crate::abi::AbiNames;
use crate::plan::{Hook, MethodPlan, Placement};
use crate::transform::HookInjector;

pub const AFTER_SUSPEND_CALL: &str = "afterSuspendCall";
pub const DO_RESUME_ENTER: &str = "doResumeEnter";
pub const DO_RESUME_EXIT: &str = "doResumeExit";

/// Injects hook calls into the generic instruction model, as static calls on `hook_owner`.
#[derive(Debug, Clone)]
pub struct IrInjector {
    hook_owner: String,
    continuation_desc: String,
}

impl IrInjector {
    pub fn new(names: &AbiNames) -> Self {
        Self {
            hook_owner: names.hook_owner.clone(),
            continuation_desc: format!("L{};", names.continuation),
        }
    }

    fn hook_call(&self, name: &str, desc: String) -> Insn {
        Insn::Invoke(InvokeInsn::new(InvokeKind::Static, self.hook_owner.clone(), name, desc))
    }

    /// `(result, continuation, index)`; the call result is duplicated so the caller still sees it.
    fn after_suspend_call(&self, index: usize, slot: usize) -> Vec<Insn> {
        vec![
            Insn::Dup,
            Insn::LoadRef(slot),
            Insn::PushInt(index as i32),
            self.hook_call(AFTER_SUSPEND_CALL, format!("(Ljava/lang/Object;{}I)V", self.continuation_desc)),
        ]
    }

    fn do_resume(&self, name: &str, index: usize, slot: usize) -> Vec<Insn> {
        vec![
            Insn::LoadRef(slot),
            Insn::PushInt(index as i32),
            self.hook_call(name, format!("({}I)V", self.continuation_desc)),
        ]
    }
}

impl HookInjector for IrInjector {
    type Error = Infallible;

    fn inject(&mut self, method: &mut CompiledMethod, plan: &MethodPlan) -> Result<(), Infallible> {
        let mut requests: Vec<_> = plan.hooks.iter().collect();
        // back to front, so earlier positions stay valid. at a shared position the code before a
        // return goes in first, so the after-call code ends up ahead of it
        requests.sort_by_key(|r| {
            let after = matches!(r.placement, Placement::After(_));
            (std::cmp::Reverse(insert_point(r.placement)), after)
        });

        for request in requests {
            let code = match request.hook {
                Hook::AfterSuspendCall { call_site, context_slot } => self.after_suspend_call(call_site.index(), context_slot),
                Hook::ResumptionEnter { resumption, context_slot } => {
                    self.do_resume(DO_RESUME_ENTER, resumption.index(), context_slot)
                },
                Hook::ResumptionExit { resumption, context_slot } => {
                    self.do_resume(DO_RESUME_EXIT, resumption.index(), context_slot)
                },
            };
            let at = InsnIdx::new(insert_point(request.placement));
            // code inserted after a call belongs to the call's line; code at the start or before a
            // return takes over the label of the instruction it precedes
            let keep_label = !matches!(request.placement, Placement::After(_));
            method.insert_insns(at, code, keep_label);
        }
        Ok(())
    }
}

fn insert_point(placement: Placement) -> usize {
    match placement {
        Placement::MethodStart => 0,
        Placement::Before(idx) => idx.index(),
        Placement::After(idx) => idx.index() + 1,
    }
}
