use std::fmt::Debug;

use crate::stack::LogicalStack;

/// Renders a stack innermost frame first, one `<function> at <file>:<line>` line per frame, with
/// no trailing newline. An empty stack renders as an empty string.
pub fn pretty_print(stack: &LogicalStack) -> String {
    let mut out = String::new();
    for (i, frame) in stack.frames().iter().rev().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&frame.element.to_string());
    }
    out
}

/// Every stack under a `Coroutine <context>:` header, frames indented.
pub fn render_all<C: Debug>(stacks: &[(C, LogicalStack)]) -> String {
    let mut out = String::new();
    for (context, stack) in stacks {
        out.push_str(&format!("Coroutine {:?}:\n", context));
        for line in pretty_print(stack).lines() {
            out.push_str(&format!("    {}\n", line));
        }
    }
    out
}
