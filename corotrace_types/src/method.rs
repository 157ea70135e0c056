use serde::{Deserialize, Serialize};
use std::fmt;

/// How a method takes part in the suspend/resume protocol.
///
/// An anonymous suspend lambda is suspend-capable and is also its own dispatcher and state
/// machine, so all four flags can be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodInfo {
    pub is_anonymous: bool,
    pub is_suspend: bool,
    pub is_do_resume: bool,
    pub is_state_machine: bool,
}

impl MethodInfo {
    pub fn needs_transform(&self) -> bool {
        self.is_suspend || self.is_state_machine || self.is_do_resume
    }
}

/// Structural identity of a method. The owner is always stored in dotted form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub name: String,
    pub owner: String,
    pub desc: String,
}

impl MethodId {
    pub fn build(name: impl Into<String>, owner: impl AsRef<str>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.as_ref().replace('/', "."),
            desc: desc.into(),
        }
    }

    /// `owner.name`, without the descriptor.
    pub fn function_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.owner, self.name, self.desc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodIdWithInfo {
    pub method: MethodId,
    pub info: MethodInfo,
}

impl MethodIdWithInfo {
    pub fn new(method: MethodId, info: MethodInfo) -> Self {
        Self { method, info }
    }
}

impl fmt::Display for MethodIdWithInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.method, self.info)
    }
}
