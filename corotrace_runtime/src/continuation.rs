/// The handle instrumented code passes to hooks. All a hook needs from it is the identity of the
/// logical coroutine it belongs to.
pub trait Continuation {
    type Context;

    fn context(&self) -> Self::Context;
}

/// What a suspend call returned: either the runtime's suspension marker or a real value.
pub trait SuspendOutcome {
    fn is_suspended(&self) -> bool;
}

impl SuspendOutcome for bool {
    fn is_suspended(&self) -> bool {
        *self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult<T> {
    Suspended,
    Returned(T),
}

impl<T> SuspendOutcome for CallResult<T> {
    fn is_suspended(&self) -> bool {
        matches!(self, CallResult::Suspended)
    }
}
