use corotrace_ir::class::{ClassInfo, CompiledMethod};
use corotrace_ir::descriptor::MethodDescriptor;
use corotrace_ir::lines::LineTable;
use corotrace_types::call::{CallPosition, MethodCall};
use corotrace_types::method::{MethodId, MethodIdWithInfo, MethodInfo};
use corotrace_types::suspend::{DoResumeForSuspend, SuspendFunction};
use log::debug;

use crate::abi::CoroutineAbi;
use crate::error::PlanError;
use crate::plan::{Hook, HookRequest, MethodPlan, Placement};
use crate::session::InstrumentationSession;

type Result<T> = std::result::Result<T, PlanError>;

/// Decides which hooks a method needs and registers their metadata.
///
/// Analysis runs to completion before anything is pushed to the registries, so a method that
/// fails to plan never consumes indices.
pub struct Planner<'a> {
    abi: &'a dyn CoroutineAbi,
    session: &'a InstrumentationSession,
}

impl<'a> Planner<'a> {
    pub fn new(abi: &'a dyn CoroutineAbi, session: &'a InstrumentationSession) -> Self {
        Self { abi, session }
    }

    /// `Ok(None)` means the method takes no part in the protocol and is left alone.
    pub fn plan_method(&self, class: &ClassInfo, method: &CompiledMethod) -> Result<Option<MethodPlan>> {
        let info = self.abi.method_info(class, method);
        if !info.needs_transform() {
            return Ok(None)
        }

        let context_slot = self.find_continuation_slot(class, method, &info)?;
        let lines = LineTable::build(method)?;
        let this_method = MethodId::build(method.name.clone(), &class.name, method.desc.clone());

        // collect everything first
        let mut calls = Vec::new();
        if info.is_suspend || info.is_state_machine {
            for (idx, call) in method.iter_invokes() {
                if !self.abi.is_suspend_call(call) {
                    continue
                }
                let position = match (&class.source_file, lines.line_of(idx)) {
                    (Some(file), Some(line)) => CallPosition::new(file.clone(), line as i32),
                    _ => CallPosition::unknown(),
                };
                debug!(
                    "instrument call {}.{}{} from {}.{} at {}:{}, cont index = {}",
                    call.owner, call.name, call.desc, class.name, method.name, position.file, position.line, context_slot
                );
                let record = MethodCall::new(
                    MethodId::build(call.name.clone(), &call.owner, call.desc.clone()),
                    position,
                    Some(this_method.clone()),
                );
                calls.push((idx, record));
            }
        }

        let mut resumption = None;
        if info.is_do_resume {
            let suspend = if info.is_state_machine {
                SuspendFunction::Anonymous(this_method.clone())
            } else {
                let named = self
                    .abi
                    .corresponding_suspend_function(class, method)
                    .ok_or(PlanError::NoCorrelation)?;
                SuspendFunction::Named(named)
            };
            let entry_position = if info.is_state_machine {
                let file = class.source_file.as_deref().unwrap_or(CallPosition::UNKNOWN_FILE);
                Some(CallPosition::new(file, lines.first_line().map_or(-1, |l| l as i32)))
            } else {
                None
            };
            let exits: Vec<_> = if info.is_state_machine {
                let exits: Vec<_> = method.value_returns().collect();
                if exits.is_empty() {
                    return Err(PlanError::NoValueReturn)
                }
                exits
            } else {
                Vec::new()
            };
            let link = DoResumeForSuspend::new(MethodIdWithInfo::new(this_method.clone(), info), suspend, entry_position);
            resumption = Some((link, exits));
        }

        // commit
        let mut hooks = Vec::new();
        let (insns, records): (Vec<_>, Vec<_>) = calls.into_iter().unzip();
        let ids = self.session.registries().push_calls(records);
        for (idx, call_site) in insns.into_iter().zip(ids) {
            hooks.push(HookRequest {
                placement: Placement::After(idx),
                hook: Hook::AfterSuspendCall { call_site, context_slot },
            });
        }

        if let Some((link, exits)) = resumption {
            debug!("registering {} as resumption of {:?}", link.do_resume, link.suspend);
            let id = self.session.registries().push_resumption(link);
            hooks.push(HookRequest {
                placement: Placement::MethodStart,
                hook: Hook::ResumptionEnter { resumption: id, context_slot },
            });
            for ret in exits {
                hooks.push(HookRequest {
                    placement: Placement::Before(ret),
                    hook: Hook::ResumptionExit { resumption: id, context_slot },
                });
            }
        }

        Ok(Some(MethodPlan {
            method: this_method,
            context_slot,
            hooks,
        }))
    }

    fn find_continuation_slot(&self, class: &ClassInfo, method: &CompiledMethod, info: &MethodInfo) -> Result<usize> {
        if self.abi.is_state_machine_base(class) && !method.access.is_static {
            // `this`
            return Ok(0)
        }
        if !info.is_suspend {
            return Err(PlanError::ContextSlot(format!(
                "{} is not suspend and its owner is not a state machine",
                method.name
            )))
        }

        let desc = MethodDescriptor::parse(&method.desc)?;
        let offset = self.abi.continuation_offset_from_end(method);
        if offset == 0 || offset > desc.args.len() {
            return Err(PlanError::ContextSlot(format!(
                "continuation offset {} doesn't fit {} arguments",
                offset,
                desc.args.len()
            )))
        }
        Ok(desc.argument_slot(desc.args.len() - offset, method.access.is_static)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiNames, ConventionAbi};
    use corotrace_ir::class::{Access, Insn, InvokeInsn, InvokeKind, ReturnKind};
    use corotrace_ir::id::InsnIdx;
    use corotrace_types::id::{CallSiteId, ResumptionId};

    const SUSPEND_DESC: &str = "(Lkotlin/coroutines/experimental/Continuation;)Ljava/lang/Object;";

    fn suspend_call(name: &str) -> Insn {
        Insn::Invoke(InvokeInsn::new(InvokeKind::Static, "app/MainKt", name, SUSPEND_DESC))
    }

    fn lambda_class(names: &AbiNames) -> ClassInfo {
        let mut m = CompiledMethod::new(&names.do_resume_name, &names.do_resume_desc, Access::default());
        m.mark_line(4);
        m.push_insn(Insn::Other(0x2a));
        m.mark_line(5);
        m.push_insn(suspend_call("foo"));
        m.push_insn(Insn::Invoke(InvokeInsn::new(InvokeKind::Virtual, "java/io/PrintStream", "println", "(I)V")));
        m.mark_line(6);
        m.push_insn(Insn::Return(ReturnKind::Value));
        m.push_insn(Insn::Return(ReturnKind::Value));

        ClassInfo::new("app/MainKt$main$1", Some(names.state_machine_base.clone()), Some("main.kt".into()))
            .with_method(m)
            .with_method(CompiledMethod::new("create", "()V", Access::default()))
    }

    #[test]
    fn ordinary_methods_pass_through() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);

        let mut m = CompiledMethod::new("plain", "(I)I", Access { is_static: true });
        m.push_insn(suspend_call("foo"));
        let class = ClassInfo::new("app/MainKt", None, Some("main.kt".into())).with_method(m);

        assert_eq!(planner.plan_method(&class, &class.methods[0]), Ok(None));
        assert_eq!(session.registries().call_count(), 0);
    }

    #[test]
    fn suspend_function_calls() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);

        let mut m = CompiledMethod::new(
            "bar",
            "(JILkotlin/coroutines/experimental/Continuation;)Ljava/lang/Object;",
            Access { is_static: true },
        );
        m.mark_line(10);
        m.push_insn(suspend_call("foo"));
        m.push_insn(Insn::Other(0x57));
        m.mark_line(11);
        m.push_insn(suspend_call("baz"));
        m.push_insn(Insn::Return(ReturnKind::Value));
        let class = ClassInfo::new("app/MainKt", None, Some("main.kt".into())).with_method(m);

        let plan = planner.plan_method(&class, &class.methods[0]).unwrap().unwrap();
        // long takes two slots, static so no receiver
        assert_eq!(plan.context_slot, 3);
        assert_eq!(plan.hooks.len(), 2);
        assert_eq!(
            plan.hooks[0],
            HookRequest {
                placement: Placement::After(InsnIdx::new(0)),
                hook: Hook::AfterSuspendCall { call_site: CallSiteId::new(0), context_slot: 3 },
            }
        );
        assert_eq!(plan.hooks[1].placement, Placement::After(InsnIdx::new(2)));

        let reg = session.registries();
        let baz = reg.call(CallSiteId::new(1)).unwrap();
        assert_eq!(baz.method.function_name(), "app.MainKt.baz");
        assert_eq!(baz.position, CallPosition::new("main.kt", 11));
        assert_eq!(baz.from_method.as_ref().unwrap().name, "bar");
        assert!(plan.resumption().is_none());
    }

    #[test]
    fn missing_line_is_unknown() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);

        let mut m = CompiledMethod::new("bar", SUSPEND_DESC, Access::default());
        m.push_insn(suspend_call("foo"));
        m.push_insn(Insn::Return(ReturnKind::Value));
        let class = ClassInfo::new("app/Foo", None, None).with_method(m);

        let plan = planner.plan_method(&class, &class.methods[0]).unwrap().unwrap();
        // instance method, receiver in slot 0
        assert_eq!(plan.context_slot, 1);
        assert!(session.registries().call(CallSiteId::new(0)).unwrap().position.is_unknown());
    }

    #[test]
    fn anonymous_state_machine() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);
        let class = lambda_class(abi.names());

        let plan = planner.plan_method(&class, &class.methods[0]).unwrap().unwrap();
        assert_eq!(plan.context_slot, 0);
        let placements: Vec<_> = plan.hooks.iter().map(|h| h.placement).collect();
        assert_eq!(
            placements,
            vec![
                Placement::After(InsnIdx::new(1)),
                Placement::MethodStart,
                Placement::Before(InsnIdx::new(3)),
                Placement::Before(InsnIdx::new(4)),
            ]
        );

        let link = session.registries().resumption(ResumptionId::new(0)).unwrap();
        assert!(link.is_self_resumption());
        assert!(link.suspend.is_anonymous());
        assert_eq!(link.do_resume_position, Some(CallPosition::new("main.kt", 4)));
        assert_eq!(plan.resumption(), Some(ResumptionId::new(0)));
    }

    #[test]
    fn named_dispatcher() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);
        let names = abi.names();

        let mut m = CompiledMethod::new(&names.do_resume_name, &names.do_resume_desc, Access::default());
        m.push_insn(suspend_call("foo"));
        m.push_insn(Insn::Return(ReturnKind::Value));
        let class = ClassInfo::new("app/MainKt$foo$1", Some(names.state_machine_base.clone()), Some("main.kt".into()))
            .with_method(m);

        let plan = planner.plan_method(&class, &class.methods[0]).unwrap().unwrap();
        // not suspend, not a state machine: only the entry hook
        assert_eq!(plan.hooks.len(), 1);
        assert_eq!(plan.hooks[0].placement, Placement::MethodStart);

        let link = session.registries().resumption(plan.resumption().unwrap()).unwrap();
        assert!(!link.is_self_resumption());
        assert_eq!(link.suspend, SuspendFunction::Named(MethodId::build("foo", "app/MainKt", SUSPEND_DESC)));
        assert_eq!(link.do_resume_position, None);
    }

    #[test]
    fn failures_leave_registries_alone() {
        let abi = ConventionAbi::default();
        let session = InstrumentationSession::new();
        let planner = Planner::new(&abi, &session);
        let names = abi.names();

        // dispatcher whose body never calls its outer function
        let mut m = CompiledMethod::new(&names.do_resume_name, &names.do_resume_desc, Access::default());
        m.push_insn(Insn::Invoke(InvokeInsn::new(InvokeKind::Static, "other/Thing", "foo", SUSPEND_DESC)));
        m.push_insn(Insn::Return(ReturnKind::Value));
        let class = ClassInfo::new("app/MainKt$foo$1", Some(names.state_machine_base.clone()), None).with_method(m);
        assert_eq!(planner.plan_method(&class, &class.methods[0]), Err(PlanError::NoCorrelation));

        // state machine that never returns a value
        let mut lambda = lambda_class(names);
        lambda.methods[0].insns.raw.retain(|i| !matches!(i, Insn::Return(_)));
        assert_eq!(planner.plan_method(&lambda, &lambda.methods[0]), Err(PlanError::NoValueReturn));

        assert_eq!(session.registries().call_count(), 0);
        assert_eq!(session.registries().resumption_count(), 0);

        // next good method still starts at zero
        let lambda = lambda_class(names);
        let plan = planner.plan_method(&lambda, &lambda.methods[0]).unwrap().unwrap();
        assert_eq!(plan.call_sites().collect::<Vec<_>>(), vec![CallSiteId::new(0)]);
    }
}
