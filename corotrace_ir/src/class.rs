use index_vec::IndexVec;
use serde::{Deserialize, Serialize};

use crate::id::InsnIdx;

// this is the input to the planner: whatever bytecode reader is in use lowers to this
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Internal (slash separated) name.
    pub name: String,
    pub super_name: Option<String>,
    pub source_file: Option<String>,
    pub methods: Vec<CompiledMethod>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, super_name: Option<String>, source_file: Option<String>) -> Self {
        Self {
            name: name.into(),
            super_name,
            source_file,
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: CompiledMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }

    /// Name of the lexically enclosing class for nested classes (`Outer$inner$1` -> `Outer`).
    pub fn outer_name(&self) -> Option<&str> {
        let simple_start = self.name.rfind('/').map_or(0, |i| i + 1);
        self.name[simple_start..]
            .find('$')
            .map(|i| &self.name[..simple_start + i])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledMethod {
    pub name: String,
    pub desc: String,
    pub access: Access,
    pub insns: IndexVec<InsnIdx, Insn>,
    // sorted by start
    pub line_numbers: Vec<LineNumberEntry>,
}

impl CompiledMethod {
    pub fn new(name: impl Into<String>, desc: impl Into<String>, access: Access) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            access,
            insns: IndexVec::new(),
            line_numbers: Vec::new(),
        }
    }

    pub fn push_insn(&mut self, insn: Insn) -> InsnIdx {
        self.insns.push(insn)
    }

    /// Marks following instructions (starting from the next one pushed) as belonging to `line`.
    pub fn mark_line(&mut self, line: u32) {
        self.line_numbers.push(LineNumberEntry {
            start: self.insns.next_idx(),
            line,
        });
    }

    /// Splices `code` in at `at`. Line entries starting after `at` move with the code they label;
    /// an entry starting exactly at `at` moves too when `keep_label` is false.
    pub fn insert_insns(&mut self, at: InsnIdx, code: Vec<Insn>, keep_label: bool) {
        let n = code.len();
        if n == 0 {
            return
        }
        let pos = at.index();
        self.insns.raw.splice(pos..pos, code);
        for entry in self.line_numbers.iter_mut() {
            let start = entry.start.index();
            if start > pos || (start == pos && !keep_label) {
                entry.start = InsnIdx::new(start + n);
            }
        }
    }

    pub fn iter_invokes(&self) -> impl Iterator<Item = (InsnIdx, &InvokeInsn)> + '_ {
        self.insns.iter_enumerated().filter_map(|(idx, insn)| match insn {
            Insn::Invoke(invoke) => Some((idx, invoke)),
            _ => None,
        })
    }

    pub fn value_returns(&self) -> impl Iterator<Item = InsnIdx> + '_ {
        self.insns.iter_enumerated().filter_map(|(idx, insn)| match insn {
            Insn::Return(ReturnKind::Value) => Some(idx),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insn {
    Invoke(InvokeInsn),
    Return(ReturnKind),
    Dup,
    LoadRef(usize),
    PushInt(i32),
    // anything the planner doesn't look at, by opcode
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeInsn {
    pub kind: InvokeKind,
    pub owner: String,
    pub name: String,
    pub desc: String,
}

impl InvokeInsn {
    pub fn new(kind: InvokeKind, owner: impl Into<String>, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            kind,
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    Void,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNumberEntry {
    pub start: InsnIdx,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_name() {
        let c = ClassInfo::new("app/MainKt$main$1", None, None);
        assert_eq!(c.outer_name(), Some("app/MainKt"));
        let c = ClassInfo::new("MainKt$foo$1", None, None);
        assert_eq!(c.outer_name(), Some("MainKt"));
        let c = ClassInfo::new("app/MainKt", None, None);
        assert_eq!(c.outer_name(), None);
    }

    #[test]
    fn builder_tracks_lines() {
        let mut m = CompiledMethod::new("f", "()V", Access::default());
        m.mark_line(3);
        m.push_insn(Insn::Other(0));
        m.mark_line(4);
        let call = m.push_insn(Insn::Invoke(InvokeInsn::new(InvokeKind::Static, "a/B", "g", "()V")));
        m.push_insn(Insn::Return(ReturnKind::Void));

        assert_eq!(m.line_numbers[1], LineNumberEntry { start: call, line: 4 });
        assert_eq!(m.iter_invokes().count(), 1);
        assert_eq!(m.value_returns().count(), 0);
    }

    #[test]
    fn insert_shifts_lines() {
        let mut m = CompiledMethod::new("f", "()Ljava/lang/Object;", Access::default());
        m.mark_line(1);
        m.push_insn(Insn::Other(0));
        m.mark_line(2);
        m.push_insn(Insn::Return(ReturnKind::Value));

        m.insert_insns(InsnIdx::new(1), vec![Insn::Dup, Insn::PushInt(3)], true);
        assert_eq!(m.insns.len(), 4);
        assert_eq!(m.line_numbers[1].start, InsnIdx::new(1));
        assert_eq!(m.insns[InsnIdx::new(3)], Insn::Return(ReturnKind::Value));

        m.insert_insns(InsnIdx::new(1), vec![Insn::Dup], false);
        assert_eq!(m.line_numbers[0].start, InsnIdx::new(0));
        assert_eq!(m.line_numbers[1].start, InsnIdx::new(2));
    }
}
