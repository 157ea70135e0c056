use serde::{Deserialize, Serialize};

use crate::call::CallPosition;
use crate::method::{MethodId, MethodIdWithInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspendFunction {
    // compiler-generated suspend lambda; its dispatcher is its own state machine
    Anonymous(MethodId),
    Named(MethodId),
}

impl SuspendFunction {
    pub fn method(&self) -> &MethodId {
        match self {
            SuspendFunction::Anonymous(m) | SuspendFunction::Named(m) => m,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, SuspendFunction::Anonymous(_))
    }
}

/// Links a resumption dispatcher to the suspend function it continues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoResumeForSuspend {
    pub do_resume: MethodIdWithInfo,
    pub suspend: SuspendFunction,
    // only known for anonymous state machines: first line of the dispatcher body
    pub do_resume_position: Option<CallPosition>,
}

impl DoResumeForSuspend {
    pub fn new(do_resume: MethodIdWithInfo, suspend: SuspendFunction, do_resume_position: Option<CallPosition>) -> Self {
        Self {
            do_resume,
            suspend,
            do_resume_position,
        }
    }

    pub fn is_self_resumption(&self) -> bool {
        self.do_resume.method == *self.suspend.method()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodInfo;

    const DO_RESUME_DESC: &str = "(Ljava/lang/Object;Ljava/lang/Throwable;)Ljava/lang/Object;";

    #[test]
    fn anonymous_dispatcher_resumes_itself() {
        let do_resume = MethodId::build("doResume", "app/MainKt$main$1", DO_RESUME_DESC);
        let info = MethodInfo {
            is_anonymous: true,
            is_suspend: false,
            is_do_resume: true,
            is_state_machine: true,
        };
        let link = DoResumeForSuspend::new(
            MethodIdWithInfo::new(do_resume.clone(), info),
            SuspendFunction::Anonymous(do_resume),
            Some(CallPosition::new("main.kt", 4)),
        );
        assert!(link.is_self_resumption());
        assert!(link.suspend.is_anonymous());
    }

    #[test]
    fn named_function_resumed_by_continuation_class() {
        let do_resume = MethodId::build("doResume", "app/MainKt$foo$1", DO_RESUME_DESC);
        let foo = MethodId::build("foo", "app/MainKt", "(Lkotlin/coroutines/experimental/Continuation;)Ljava/lang/Object;");
        let info = MethodInfo {
            is_do_resume: true,
            ..Default::default()
        };
        let link = DoResumeForSuspend::new(MethodIdWithInfo::new(do_resume, info), SuspendFunction::Named(foo.clone()), None);
        assert!(!link.is_self_resumption());
        assert_eq!(link.suspend.method(), &foo);
    }
}
