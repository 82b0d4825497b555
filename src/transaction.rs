//! Transaction-ID store (spec.md §4.B): a bounded ring buffer of in-flight
//! candidate-level STUN transaction IDs.

/// Length of a STUN transaction ID in bytes (RFC 5389 §6).
pub const TRANSACTION_ID_LEN: usize = 12;

pub type TransactionId = [u8; TRANSACTION_ID_LEN];

#[derive(Debug, Clone, Copy)]
struct Slot {
    in_use: bool,
    id: TransactionId,
}

/// Fixed-capacity set of outstanding candidate-level request IDs
/// (server-reflexive probes, TURN Allocate/Refresh). Pair-level requests
/// are matched directly on the pair instead — see `candidate::CandidatePair`.
pub struct TransactionIdStore {
    slots: Vec<Slot>,
    write_index: usize,
}

impl TransactionIdStore {
    /// `TransactionIdStore_Init`: allocate `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![
                Slot {
                    in_use: false,
                    id: [0u8; TRANSACTION_ID_LEN],
                };
                capacity
            ],
            write_index: 0,
        }
    }

    /// `TransactionIdStore_Insert`: write at the cursor, overwriting the
    /// oldest entry once the ring is full. Callers must check [`Self::has_id`]
    /// first to keep insertion idempotent.
    pub fn insert(&mut self, id: TransactionId) {
        if self.slots.is_empty() {
            return;
        }

        self.slots[self.write_index] = Slot { in_use: true, id };
        self.write_index = (self.write_index + 1) % self.slots.len();
    }

    /// `TransactionIdStore_HasId`: linear scan of in-use slots.
    pub fn has_id(&self, id: &TransactionId) -> bool {
        self.slots.iter().any(|s| s.in_use && &s.id == id)
    }

    /// `TransactionIdStore_Remove`: clear the matching slot, if any.
    pub fn remove(&mut self, id: &TransactionId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.in_use && &s.id == id) {
            slot.in_use = false;
            slot.id = [0u8; TRANSACTION_ID_LEN];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_has_id() {
        let mut store = TransactionIdStore::new(4);
        let id = [1u8; TRANSACTION_ID_LEN];
        assert!(!store.has_id(&id));
        store.insert(id);
        assert!(store.has_id(&id));
    }

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let mut store = TransactionIdStore::new(2);
        let a = [1u8; TRANSACTION_ID_LEN];
        let b = [2u8; TRANSACTION_ID_LEN];
        let c = [3u8; TRANSACTION_ID_LEN];

        store.insert(a);
        store.insert(b);
        store.insert(c);

        assert!(!store.has_id(&a));
        assert!(store.has_id(&b));
        assert!(store.has_id(&c));
    }

    #[test]
    fn remove_clears_slot() {
        let mut store = TransactionIdStore::new(4);
        let id = [7u8; TRANSACTION_ID_LEN];
        store.insert(id);
        store.remove(&id);
        assert!(!store.has_id(&id));
    }
}
