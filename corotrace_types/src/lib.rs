pub mod call;
pub mod id;
pub mod method;
pub mod registry;
pub mod suspend;
