use corotrace_ir::descriptor::DescriptorError;
use corotrace_ir::lines::LineTableError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("bad descriptor")]
    Descriptor(#[from] DescriptorError),
    #[error("bad line number table")]
    LineTable(#[from] LineTableError),
    #[error("can't locate continuation slot: {0}")]
    ContextSlot(String),
    #[error("no suspend function found for resumption dispatcher")]
    NoCorrelation,
    #[error("state machine has no value return to hook")]
    NoValueReturn,
}
