use corotrace_types::call::{CallPosition, MethodCall, StackFrame};
use corotrace_types::id::{CallSiteId, ResumptionId};
use corotrace_types::method::MethodId;
use corotrace_types::suspend::DoResumeForSuspend;
use serde::Serialize;

/// What to do when the call site that was just reported suspends again before any resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FramePolicy {
    /// Every report is its own frame, so direct recursion shows each level.
    #[default]
    Stack,
    /// A repeated report refreshes the existing frame.
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameOrigin {
    Call(CallSiteId),
    // pushed by a dispatcher entry that had no frame waiting for it
    Entry(ResumptionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameState {
    Suspended,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub element: StackFrame,
    pub origin: FrameOrigin,
    /// The function executing in this frame.
    pub function: MethodId,
    pub caller: Option<MethodId>,
    pub state: FrameState,
}

impl Frame {
    fn from_call(id: CallSiteId, call: &MethodCall) -> Self {
        Self {
            element: call.stack_frame(),
            origin: FrameOrigin::Call(id),
            function: call.method.clone(),
            caller: call.from_method.clone(),
            state: FrameState::Suspended,
        }
    }

    fn entry(id: ResumptionId, link: &DoResumeForSuspend) -> Self {
        let function = link.suspend.method().clone();
        let position = link.do_resume_position.clone().unwrap_or_else(CallPosition::unknown);
        Self {
            element: StackFrame {
                function: function.function_name(),
                file: position.file,
                line: position.line,
            },
            origin: FrameOrigin::Entry(id),
            function,
            caller: None,
            state: FrameState::Running,
        }
    }
}

/// Reconstructed stack of one coroutine. Frames are stored outermost first.
///
/// A suspension unwinds the physical stack innermost first, so the call sites of one
/// suspension are reported in that order: each report whose callee is the caller of the frame
/// inserted just before it goes underneath that frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogicalStack {
    frames: Vec<Frame>,
    // frame inserted by the last report of the ongoing suspension, if any
    #[serde(skip)]
    unwinding: Option<usize>,
}

impl LogicalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// A suspend call returned the suspension marker.
    pub fn suspended_at(&mut self, id: CallSiteId, call: &MethodCall, policy: FramePolicy) {
        if let Some(i) = self.unwinding {
            if policy == FramePolicy::Coalesce && self.frames[i].origin == FrameOrigin::Call(id) {
                self.frames[i] = Frame::from_call(id, call);
                return
            }
        }

        let target = match self.unwinding {
            Some(i) if self.frames[i].caller.as_ref() == Some(&call.method) => i,
            _ => self.frames.len(),
        };
        self.frames.insert(target, Frame::from_call(id, call));
        self.unwinding = Some(target);
    }

    /// A dispatcher started running `link.suspend`. Frames inner to the one waiting on it have
    /// completed.
    pub fn resumed(&mut self, id: ResumptionId, link: &DoResumeForSuspend) {
        self.unwinding = None;
        match self.find(link.suspend.method()) {
            Some(i) => {
                self.frames.truncate(i + 1);
                self.frames[i].state = FrameState::Running;
            },
            None => self.frames.push(Frame::entry(id, link)),
        }
    }

    /// A state-machine dispatcher is returning. Returns `false` when the return is only the
    /// dispatcher handing the suspension marker back to the scheduler.
    pub fn exited(&mut self, link: &DoResumeForSuspend) -> bool {
        if self.unwinding.take().is_some() {
            return false
        }
        match self.find(link.suspend.method()) {
            Some(i) => self.frames.truncate(i),
            None => {
                self.frames.pop();
            },
        }
        true
    }

    fn find(&self, function: &MethodId) -> Option<usize> {
        self.frames.iter().rposition(|f| &f.function == function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corotrace_types::method::{MethodIdWithInfo, MethodInfo};
    use corotrace_types::suspend::SuspendFunction;

    const DESC: &str = "(Lkotlin/coroutines/experimental/Continuation;)Ljava/lang/Object;";

    fn method(name: &str) -> MethodId {
        MethodId::build(name, "app/MainKt", DESC)
    }

    fn call(callee: &str, caller: &str, line: i32) -> MethodCall {
        MethodCall::new(method(callee), CallPosition::new("main.kt", line), Some(method(caller)))
    }

    fn lambda_link(name: &str) -> DoResumeForSuspend {
        let m = method(name);
        DoResumeForSuspend::new(
            MethodIdWithInfo::new(m.clone(), MethodInfo::default()),
            SuspendFunction::Anonymous(m),
            Some(CallPosition::new("main.kt", 1)),
        )
    }

    fn named_link(name: &str) -> DoResumeForSuspend {
        DoResumeForSuspend::new(
            MethodIdWithInfo::new(MethodId::build("doResume", format!("app/MainKt${}$1", name), "()V"), MethodInfo::default()),
            SuspendFunction::Named(method(name)),
            None,
        )
    }

    fn names(stack: &LogicalStack) -> Vec<&str> {
        stack.frames().iter().map(|f| f.function.name.as_str()).collect()
    }

    #[test]
    fn unwinding_reports_build_outward() {
        let mut s = LogicalStack::new();
        s.resumed(ResumptionId::new(0), &lambda_link("lambda"));
        s.suspended_at(CallSiteId::new(0), &call("delay", "foo", 5), FramePolicy::Stack);
        s.suspended_at(CallSiteId::new(1), &call("foo", "bar", 8), FramePolicy::Stack);
        s.suspended_at(CallSiteId::new(2), &call("bar", "lambda", 2), FramePolicy::Stack);
        assert_eq!(names(&s), vec!["lambda", "bar", "foo", "delay"]);
        assert_eq!(s.innermost().unwrap().element.line, 5);
    }

    #[test]
    fn unrelated_report_goes_on_top() {
        let mut s = LogicalStack::new();
        s.suspended_at(CallSiteId::new(0), &call("a", "x", 1), FramePolicy::Stack);
        s.suspended_at(CallSiteId::new(1), &call("b", "y", 2), FramePolicy::Stack);
        assert_eq!(names(&s), vec!["a", "b"]);
    }

    #[test]
    fn resume_drops_finished_frames() {
        let mut s = LogicalStack::new();
        s.resumed(ResumptionId::new(0), &lambda_link("lambda"));
        s.suspended_at(CallSiteId::new(0), &call("delay", "foo", 5), FramePolicy::Stack);
        s.suspended_at(CallSiteId::new(1), &call("foo", "lambda", 2), FramePolicy::Stack);

        s.resumed(ResumptionId::new(1), &named_link("foo"));
        assert_eq!(names(&s), vec!["lambda", "foo"]);
        assert_eq!(s.innermost().unwrap().state, FrameState::Running);

        s.resumed(ResumptionId::new(0), &lambda_link("lambda"));
        assert_eq!(names(&s), vec!["lambda"]);

        assert!(s.exited(&lambda_link("lambda")));
        assert!(s.is_empty());
    }

    #[test]
    fn exit_after_suspension_is_not_completion() {
        let mut s = LogicalStack::new();
        s.resumed(ResumptionId::new(0), &lambda_link("lambda"));
        s.suspended_at(CallSiteId::new(0), &call("foo", "lambda", 2), FramePolicy::Stack);
        assert!(!s.exited(&lambda_link("lambda")));
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn unmatched_resume_pushes_entry() {
        let mut s = LogicalStack::new();
        s.resumed(ResumptionId::new(3), &lambda_link("lambda"));
        let f = s.innermost().unwrap();
        assert_eq!(f.origin, FrameOrigin::Entry(ResumptionId::new(3)));
        assert_eq!(f.element.to_string(), "app.MainKt.lambda at main.kt:1");

        s.resumed(ResumptionId::new(4), &named_link("other"));
        assert_eq!(s.depth(), 2);
        assert_eq!(s.innermost().unwrap().element.file, "unknown");
    }

    #[test]
    fn unmatched_exit_pops_innermost() {
        let mut s = LogicalStack::new();
        s.resumed(ResumptionId::new(0), &lambda_link("a"));
        s.resumed(ResumptionId::new(1), &lambda_link("b"));
        assert!(s.exited(&lambda_link("c")));
        assert_eq!(names(&s), vec!["a"]);
        assert!(s.exited(&lambda_link("c")));
        assert!(s.exited(&lambda_link("c")));
        assert!(s.is_empty());
    }

    #[test]
    fn repeated_call_site_policies() {
        let rec = call("rec", "rec", 7);

        let mut stacked = LogicalStack::new();
        for _ in 0..3 {
            stacked.suspended_at(CallSiteId::new(0), &rec, FramePolicy::Stack);
        }
        assert_eq!(stacked.depth(), 3);

        let mut coalesced = LogicalStack::new();
        for _ in 0..3 {
            coalesced.suspended_at(CallSiteId::new(0), &rec, FramePolicy::Coalesce);
        }
        assert_eq!(coalesced.depth(), 1);
    }
}
