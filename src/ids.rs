use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of fresh element identifiers for the repair passes.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// `id_` followed by an upper-case simple v4 uuid.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        format!("id_{}", raw)
    }
}

/// Deterministic `id_1`, `id_2`, ... sequence.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("id_{}", n)
    }
}
