use index_vec::IndexVec;
use thiserror::Error;

use crate::class::CompiledMethod;
use crate::id::InsnIdx;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineTableError {
    #[error("line entry for line {line} starts at {start}, past the end of a {len} instruction body")]
    OutOfBounds { start: usize, line: u32, len: usize },
    #[error("line entries not sorted by start: {prev} then {next}")]
    Unsorted { prev: usize, next: usize },
}

/// Per-instruction line lookup, built in one pass over the method's line table.
#[derive(Debug, Clone)]
pub struct LineTable {
    lines: IndexVec<InsnIdx, Option<u32>>,
}

impl LineTable {
    pub fn build(method: &CompiledMethod) -> Result<Self, LineTableError> {
        let len = method.insns.len();
        let mut lines = IndexVec::with_capacity(len);
        let mut entries = method.line_numbers.iter().peekable();
        let mut current = None;
        let mut prev_start: Option<InsnIdx> = None;

        for idx in method.insns.indices() {
            while let Some(entry) = entries.peek() {
                if entry.start > idx {
                    break
                }
                if let Some(prev) = prev_start {
                    if entry.start < prev {
                        return Err(LineTableError::Unsorted {
                            prev: prev.index(),
                            next: entry.start.index(),
                        })
                    }
                }
                prev_start = Some(entry.start);
                current = Some(entry.line);
                entries.next();
            }
            lines.push(current);
        }

        // whatever's left either points past the body or is out of order
        for entry in entries {
            if entry.start.index() < len {
                return Err(LineTableError::Unsorted {
                    prev: prev_start.map_or(0, |p| p.index()),
                    next: entry.start.index(),
                })
            }
            // a label right after the last instruction is harmless
            if entry.start.index() > len {
                return Err(LineTableError::OutOfBounds {
                    start: entry.start.index(),
                    line: entry.line,
                    len,
                })
            }
        }

        Ok(Self { lines })
    }

    pub fn line_of(&self, idx: InsnIdx) -> Option<u32> {
        self.lines.get(idx).copied().flatten()
    }

    /// Line of the first instruction that has one.
    pub fn first_line(&self) -> Option<u32> {
        self.lines.iter().find_map(|l| *l)
    }
}
