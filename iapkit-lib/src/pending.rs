//! Correlation of host activity results with the operation that started them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, PoisonError};

/// Activity finished normally.
pub const RESULT_OK: i32 = -1;
/// Activity was cancelled or crashed.
pub const RESULT_CANCELED: i32 = 0;

const FIRST_REQUEST_CODE: i32 = 0x1000;
// Host request codes only carry the lower 16 bits.
const MAX_REQUEST_CODE: i32 = 0xFFFF;

/// Operations awaiting an activity result, keyed by generated request code.
#[derive(Debug)]
pub struct PendingTable<Op> {
    next: AtomicI32,
    ops: Mutex<HashMap<i32, Op>>,
}

impl<Op> PendingTable<Op> {
    pub fn new() -> Self {
        Self {
            next: AtomicI32::new(FIRST_REQUEST_CODE),
            ops: Mutex::new(HashMap::new()),
        }
    }

    fn next_code(&self) -> i32 {
        let code = self.next.fetch_add(1, Ordering::Relaxed);
        if code >= MAX_REQUEST_CODE {
            self.next.store(FIRST_REQUEST_CODE + 1, Ordering::Relaxed);
            return FIRST_REQUEST_CODE;
        }
        code
    }

    /// Store `op` and return the request code to launch it with.
    pub fn register(&self, op: Op) -> i32 {
        let code = self.next_code();
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code, op);
        code
    }

    /// Remove and return the operation for `request_code`.
    pub fn take(&self, request_code: i32) -> Option<Op> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_code)
    }

    pub fn len(&self) -> usize {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Op> Default for PendingTable<Op> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_taken_once() {
        let table = PendingTable::new();
        let a = table.register("account");
        let b = table.register("payment");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);

        assert_eq!(table.take(b), Some("payment"));
        assert_eq!(table.take(b), None);
        assert_eq!(table.take(9), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn codes_stay_within_sixteen_bits() {
        let table = PendingTable::new();
        table.next.store(MAX_REQUEST_CODE - 1, Ordering::Relaxed);
        let last = table.register(());
        let wrapped = table.register(());
        assert_eq!(last, MAX_REQUEST_CODE - 1);
        assert_eq!(wrapped, FIRST_REQUEST_CODE);
        assert_eq!(table.register(()), FIRST_REQUEST_CODE + 1);
    }
}
