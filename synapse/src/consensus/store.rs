//! Single-slot holder for the local neural state.
//!
//! The slot is shared between the consensus loop (which swaps in synced
//! states) and facade callers (which read it, and commit confirmed
//! gradient updates). Readers always see a complete [`NeuralState`]:
//! replacement is an `Arc` swap, never a field-wise update.

use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, MutexGuard};

use crate::types::NeuralState;

/// Exclusive-writer, many-reader slot for the current [`NeuralState`].
///
/// Writers that need a read-modify-write sequence take the writer lock via
/// [`StateSlot::lock_writer`] and hold it until they commit, so a sync
/// cannot interleave with a gradient update half-way through.
#[derive(Default)]
pub struct StateSlot {
    current: RwLock<Option<Arc<NeuralState>>>,
    writer: Mutex<()>,
}

/// Proof that the writer lock is held; commits go through it.
pub struct SlotWriter<'a> {
    slot: &'a StateSlot,
    _guard: MutexGuard<'a, ()>,
}

impl StateSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state, if any.
    pub fn get(&self) -> Option<Arc<NeuralState>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Version of the current state, if any.
    pub fn version(&self) -> Option<u64> {
        self.get().map(|s| s.version)
    }

    /// Waits for exclusive write access.
    pub async fn lock_writer(&self) -> SlotWriter<'_> {
        SlotWriter {
            slot: self,
            _guard: self.writer.lock().await,
        }
    }

    /// Replaces the current state under the writer lock.
    pub async fn replace(&self, state: NeuralState) -> Arc<NeuralState> {
        self.lock_writer().await.commit(state)
    }

    /// Drops the current state.
    pub async fn clear(&self) {
        let _writer = self.lock_writer().await;
        self.store(None);
    }

    fn store(&self, value: Option<Arc<NeuralState>>) {
        match self.current.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl SlotWriter<'_> {
    /// Current state as seen by the writer.
    pub fn current(&self) -> Option<Arc<NeuralState>> {
        self.slot.get()
    }

    /// Atomically swaps in `state` and returns the shared handle.
    pub fn commit(self, state: NeuralState) -> Arc<NeuralState> {
        let state = Arc::new(state);
        self.slot.store(Some(state.clone()));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tensor;

    fn state(version: u64) -> NeuralState {
        NeuralState::unsigned(
            Tensor::from_vec(vec![1.0, 2.0]),
            Tensor::from_vec(vec![0.1, 0.2]),
            1000,
            version,
        )
    }

    #[tokio::test]
    async fn starts_empty_and_replaces_wholesale() {
        let slot = StateSlot::new();
        assert!(slot.get().is_none());
        assert_eq!(slot.version(), None);

        let first = slot.replace(state(3)).await;
        assert_eq!(first.version, 3);

        let held = slot.get().expect("state present");
        slot.replace(state(4)).await;

        // Earlier handles keep observing the value they were given.
        assert_eq!(held.version, 3);
        assert_eq!(slot.version(), Some(4));
    }

    #[tokio::test]
    async fn clear_drops_state() {
        let slot = StateSlot::new();
        slot.replace(state(1)).await;
        slot.clear().await;
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn writer_lock_serialises_commits() {
        let slot = Arc::new(StateSlot::new());
        let writer = slot.lock_writer().await;

        let contender = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.replace(state(9)).await.version })
        };

        // The contender cannot commit while we hold the writer lock.
        tokio::task::yield_now().await;
        assert!(slot.get().is_none());

        writer.commit(state(5));
        assert_eq!(contender.await.unwrap(), 9);
        assert_eq!(slot.version(), Some(9));
    }
}
