use index_vec::IndexVec;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::call::MethodCall;
use crate::id::{CallSiteId, ResumptionId};
use crate::suspend::DoResumeForSuspend;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to encode registries")]
    Encode(#[source] bincode::Error),
    #[error("failed to decode registries")]
    Decode(#[source] bincode::Error),
}

/// Append-only tables of instrumented call sites and resumption links.
///
/// Indices handed out here are embedded in generated hook calls, so a record is never moved
/// or removed once pushed. Appends hold the write lock only for the push itself, and return the
/// index while still holding it, so no reader can see an index before its record.
#[derive(Debug, Default)]
pub struct Registries {
    calls: RwLock<IndexVec<CallSiteId, Arc<MethodCall>>>,
    resumptions: RwLock<IndexVec<ResumptionId, Arc<DoResumeForSuspend>>>,
}

// flat form used for persistence
#[derive(Serialize, Deserialize)]
struct FlatRegistries {
    calls: Vec<MethodCall>,
    resumptions: Vec<DoResumeForSuspend>,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_call(&self, call: MethodCall) -> CallSiteId {
        self.calls.write().push(Arc::new(call))
    }

    /// Pushes a batch under one lock; the returned ids are contiguous.
    pub fn push_calls(&self, calls: impl IntoIterator<Item = MethodCall>) -> Vec<CallSiteId> {
        let mut table = self.calls.write();
        calls.into_iter().map(|c| table.push(Arc::new(c))).collect()
    }

    pub fn push_resumption(&self, link: DoResumeForSuspend) -> ResumptionId {
        self.resumptions.write().push(Arc::new(link))
    }

    pub fn call(&self, id: CallSiteId) -> Option<Arc<MethodCall>> {
        self.calls.read().get(id).cloned()
    }

    pub fn resumption(&self, id: ResumptionId) -> Option<Arc<DoResumeForSuspend>> {
        self.resumptions.read().get(id).cloned()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn resumption_count(&self) -> usize {
        self.resumptions.read().len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, RegistryError> {
        let flat = FlatRegistries {
            calls: self.calls.read().iter().map(|c| MethodCall::clone(c)).collect(),
            resumptions: self.resumptions.read().iter().map(|r| DoResumeForSuspend::clone(r)).collect(),
        };
        bincode::serialize(&flat).map_err(RegistryError::Encode)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, RegistryError> {
        let flat: FlatRegistries = bincode::deserialize(buf).map_err(RegistryError::Decode)?;
        Ok(Self {
            calls: RwLock::new(flat.calls.into_iter().map(Arc::new).collect()),
            resumptions: RwLock::new(flat.resumptions.into_iter().map(Arc::new).collect()),
        })
    }
}
