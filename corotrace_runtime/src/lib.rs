pub mod continuation;
pub mod event;
pub mod export;
pub mod manager;
pub mod pretty;
pub mod stack;

pub use continuation::{CallResult, Continuation, SuspendOutcome};
pub use event::{ResumptionPhase, StackChange, StackChangedEvent, StackEvent};
pub use manager::{ContextKey, EngineConfig, StacksManager, SubscriptionId};
pub use pretty::{pretty_print, render_all};
pub use stack::{Frame, FrameOrigin, FramePolicy, FrameState, LogicalStack};
