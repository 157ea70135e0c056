use serde::{Deserialize, Serialize};
use std::fmt;

use crate::method::MethodId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallPosition {
    pub file: String,
    pub line: i32,
}

impl CallPosition {
    pub const UNKNOWN_FILE: &'static str = "unknown";

    pub fn new(file: impl Into<String>, line: i32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_FILE, -1)
    }

    pub fn is_unknown(&self) -> bool {
        self.line < 0 && self.file == Self::UNKNOWN_FILE
    }
}

/// A suspend call site inside instrumented code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: MethodId,
    pub position: CallPosition,
    pub from_method: Option<MethodId>,
}

impl MethodCall {
    pub fn new(method: MethodId, position: CallPosition, from_method: Option<MethodId>) -> Self {
        Self {
            method,
            position,
            from_method,
        }
    }

    pub fn stack_frame(&self) -> StackFrame {
        StackFrame {
            function: self.method.function_name(),
            file: self.position.file.clone(),
            line: self.position.line,
        }
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.method, self.position.file, self.position.line)
    }
}

/// Renderable view of a logical frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: i32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.function, self.file, self.line)
    }
}
