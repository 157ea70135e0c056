use corotrace_ir::class::{ClassInfo, CompiledMethod, InvokeInsn};
use corotrace_ir::descriptor::MethodDescriptor;
use corotrace_types::method::{MethodId, MethodInfo};

/// Host coroutine ABI classifier. Everything that depends on how a particular compiler lowers
/// suspend functions lives behind this trait.
pub trait CoroutineAbi: Send + Sync {
    fn is_suspend(&self, method: &CompiledMethod) -> bool;

    fn is_suspend_call(&self, call: &InvokeInsn) -> bool;

    fn is_do_resume(&self, class: &ClassInfo, method: &CompiledMethod) -> bool;

    /// Dispatcher that is itself the state machine of an anonymous suspend lambda.
    fn is_state_machine(&self, class: &ClassInfo, method: &CompiledMethod) -> bool;

    /// Class is (or directly extends) the base type of generated state machines, so the
    /// continuation is the receiver.
    fn is_state_machine_base(&self, class: &ClassInfo) -> bool;

    /// Position of the continuation parameter counted from the end of the argument list, 1 being
    /// the last argument.
    fn continuation_offset_from_end(&self, method: &CompiledMethod) -> usize;

    /// The named suspend function a non-anonymous dispatcher resumes.
    fn corresponding_suspend_function(&self, class: &ClassInfo, method: &CompiledMethod) -> Option<MethodId>;

    /// Classes that must never be rewritten, e.g. the hook implementation itself.
    fn is_excluded(&self, _class: &ClassInfo) -> bool {
        false
    }

    fn method_info(&self, class: &ClassInfo, method: &CompiledMethod) -> MethodInfo {
        let is_state_machine = self.is_state_machine(class, method);
        MethodInfo {
            is_anonymous: is_state_machine,
            is_suspend: self.is_suspend(method),
            is_do_resume: self.is_do_resume(class, method),
            is_state_machine,
        }
    }
}

/// Type and member names a [`ConventionAbi`] matches against. All type names are internal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiNames {
    pub continuation: String,
    pub state_machine_base: String,
    pub do_resume_name: String,
    pub do_resume_desc: String,
    // only anonymous lambdas get a `create`
    pub lambda_marker_method: String,
    pub default_args_suffix: String,
    pub hook_package: String,
    pub hook_owner: String,
}

impl Default for AbiNames {
    fn default() -> Self {
        Self {
            continuation: "kotlin/coroutines/experimental/Continuation".into(),
            state_machine_base: "kotlin/coroutines/experimental/jvm/internal/CoroutineImpl".into(),
            do_resume_name: "doResume".into(),
            do_resume_desc: "(Ljava/lang/Object;Ljava/lang/Throwable;)Ljava/lang/Object;".into(),
            lambda_marker_method: "create".into(),
            default_args_suffix: "$default".into(),
            hook_package: "corotrace/".into(),
            hook_owner: "corotrace/runtime/InstrumentedCodeEventsHandler".into(),
        }
    }
}

/// Classifies methods purely from names and descriptors.
#[derive(Debug, Clone, Default)]
pub struct ConventionAbi {
    names: AbiNames,
}

impl ConventionAbi {
    pub fn new(names: AbiNames) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &AbiNames {
        &self.names
    }

    fn offset_for(&self, name: &str) -> usize {
        // `foo$default(args.., cont, mask, marker)`
        if name.ends_with(&self.names.default_args_suffix) {
            3
        } else {
            1
        }
    }

    fn has_continuation_at(&self, name: &str, desc: &str) -> bool {
        let desc = match MethodDescriptor::parse(desc) {
            Ok(d) => d,
            Err(_) => return false,
        };
        let offset = self.offset_for(name);
        desc.args.len() >= offset
            && desc.args[desc.args.len() - offset].is_object(&self.names.continuation)
            && desc.ret.is_object("java/lang/Object")
    }
}

impl CoroutineAbi for ConventionAbi {
    fn is_suspend(&self, method: &CompiledMethod) -> bool {
        self.has_continuation_at(&method.name, &method.desc)
    }

    fn is_suspend_call(&self, call: &InvokeInsn) -> bool {
        self.has_continuation_at(&call.name, &call.desc)
    }

    fn is_do_resume(&self, class: &ClassInfo, method: &CompiledMethod) -> bool {
        method.name == self.names.do_resume_name
            && method.desc == self.names.do_resume_desc
            && !method.insns.is_empty()
            && class.super_name.as_deref() == Some(self.names.state_machine_base.as_str())
    }

    fn is_state_machine(&self, class: &ClassInfo, method: &CompiledMethod) -> bool {
        self.is_do_resume(class, method) && class.has_method(&self.names.lambda_marker_method)
    }

    fn is_state_machine_base(&self, class: &ClassInfo) -> bool {
        class.name == self.names.state_machine_base
            || class.super_name.as_deref() == Some(self.names.state_machine_base.as_str())
    }

    fn continuation_offset_from_end(&self, method: &CompiledMethod) -> usize {
        self.offset_for(&method.name)
    }

    fn corresponding_suspend_function(&self, class: &ClassInfo, method: &CompiledMethod) -> Option<MethodId> {
        let outer = class.outer_name()?;
        method
            .iter_invokes()
            .map(|(_, call)| call)
            .find(|call| call.owner == outer && self.is_suspend_call(call))
            .map(|call| MethodId::build(call.name.clone(), &call.owner, call.desc.clone()))
    }

    fn is_excluded(&self, class: &ClassInfo) -> bool {
        class.name.starts_with(&self.names.hook_package)
    }
}
