pub mod abi;
pub mod codegen;
pub mod error;
pub mod plan;
pub mod planner;
pub mod session;
pub mod transform;

pub use abi::{AbiNames, ConventionAbi, CoroutineAbi};
pub use error::PlanError;
pub use plan::{Hook, HookRequest, MethodPlan, Placement};
pub use planner::Planner;
pub use session::InstrumentationSession;
pub use transform::{transform_class, ClassReport, HookInjector};
