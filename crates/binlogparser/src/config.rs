use crate::types::{KindSet, RecordKind};

/// Default read buffer wrapped around the compressed file.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Options for a decode session.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Capacity of the file buffer the gzip decoder reads from. This is the
    /// only buffer on the compressed side when opening a path.
    pub buffer_capacity: usize,
    /// Record kinds to yield as events. Everything else is skipped.
    pub interest: KindSet,
}

impl ReaderConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Only yield events of the given kinds.
    pub fn with_kinds(mut self, kinds: &[RecordKind]) -> Self {
        self.interest = KindSet::from_kinds(kinds);
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            interest: KindSet::all(),
        }
    }
}
