pub mod class;
pub mod descriptor;
pub mod id;
pub mod lines;
