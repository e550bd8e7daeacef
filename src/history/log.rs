//! The transaction log: bounded undo/redo stacks and compound bracketing.
//!
//! The log is passive storage; the
//! [`DesignModel`](crate::tree::DesignModel) drives inversion and replay.
//! `record` is the path every fresh mutation takes (evicts past the depth
//! limit, clears redo); `push_undo`/`push_redo` are the replay machinery's
//! path and touch nothing else.

use std::collections::VecDeque;

use super::record::TransactionRecord;

/// Default maximum undo depth.
pub const DEFAULT_DEPTH: usize = 100;

/// Bounded undo/redo record storage with a nestable begin/end counter.
#[derive(Debug)]
pub struct TransactionLog {
    undo: VecDeque<TransactionRecord>,
    redo: Vec<TransactionRecord>,
    depth: usize,
    open: u32,
}

impl TransactionLog {
    /// Create a log with the default depth limit.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    /// Create a log with a custom depth limit (minimum 1).
    pub fn with_depth(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
            open: 0,
        }
    }

    /// Append a fresh mutation record: clears redo, evicts the oldest entry
    /// past the depth limit (oldest undo is silently lost, not an error).
    pub fn record(&mut self, record: TransactionRecord) {
        self.redo.clear();
        self.undo.push_back(record);
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Open a compound transaction. Nested calls only bump the counter; only
    /// the outermost call emits a `Begin` record.
    pub fn begin(&mut self) {
        self.open += 1;
        if self.open == 1 {
            self.record(TransactionRecord::Begin);
        }
    }

    /// Close a compound transaction. Only reaching zero depth emits an `End`
    /// record. Returns `false` on an unmatched call.
    pub fn end(&mut self) -> bool {
        if self.open == 0 {
            return false;
        }
        self.open -= 1;
        if self.open == 0 {
            self.record(TransactionRecord::End);
        }
        true
    }

    /// Current bracketing depth; non-zero while a compound is open.
    pub fn open_depth(&self) -> u32 {
        self.open
    }

    /// Pop the newest undo record.
    pub fn pop_undo(&mut self) -> Option<TransactionRecord> {
        self.undo.pop_back()
    }

    /// Pop the newest redo record.
    pub fn pop_redo(&mut self) -> Option<TransactionRecord> {
        self.redo.pop()
    }

    /// Push onto the undo stack without clearing redo (replay path).
    pub fn push_undo(&mut self, record: TransactionRecord) {
        self.undo.push_back(record);
    }

    /// Push onto the redo stack (replay path).
    pub fn push_redo(&mut self, record: TransactionRecord) {
        self.redo.push(record);
    }

    /// Number of undo records.
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo records.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Drop all records and close any open bracket.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open = 0;
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_clears_redo() {
        let mut log = TransactionLog::new();
        log.record(TransactionRecord::Begin);
        log.push_redo(TransactionRecord::End);
        assert_eq!(log.redo_len(), 1);
        log.record(TransactionRecord::End);
        assert_eq!(log.redo_len(), 0);
        assert_eq!(log.undo_len(), 2);
    }

    #[test]
    fn eviction_past_depth() {
        let mut log = TransactionLog::with_depth(3);
        for _ in 0..5 {
            log.record(TransactionRecord::Begin);
        }
        assert_eq!(log.undo_len(), 3);
    }

    #[test]
    fn nested_begin_end_emit_once() {
        let mut log = TransactionLog::new();
        log.begin();
        log.begin();
        assert_eq!(log.open_depth(), 2);
        assert_eq!(log.undo_len(), 1); // one Begin
        assert!(log.end());
        assert_eq!(log.undo_len(), 1); // still no End
        assert!(log.end());
        assert_eq!(log.undo_len(), 2); // Begin + End
        assert_eq!(log.open_depth(), 0);
    }

    #[test]
    fn unmatched_end_reports_false() {
        let mut log = TransactionLog::new();
        assert!(!log.end());
        assert_eq!(log.undo_len(), 0);
    }

    #[test]
    fn pop_order_is_lifo() {
        let mut log = TransactionLog::new();
        log.record(TransactionRecord::Begin);
        log.record(TransactionRecord::End);
        assert_eq!(log.pop_undo(), Some(TransactionRecord::End));
        assert_eq!(log.pop_undo(), Some(TransactionRecord::Begin));
        assert_eq!(log.pop_undo(), None);
    }

    #[test]
    fn replay_pushes_do_not_clear_redo() {
        let mut log = TransactionLog::new();
        log.push_redo(TransactionRecord::Begin);
        log.push_undo(TransactionRecord::End);
        assert_eq!(log.redo_len(), 1);
        assert_eq!(log.undo_len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut log = TransactionLog::new();
        log.begin();
        log.record(TransactionRecord::End);
        log.push_redo(TransactionRecord::Begin);
        log.clear();
        assert_eq!(log.undo_len(), 0);
        assert_eq!(log.redo_len(), 0);
        assert_eq!(log.open_depth(), 0);
    }

    #[test]
    fn depth_minimum_is_one() {
        let mut log = TransactionLog::with_depth(0);
        log.record(TransactionRecord::Begin);
        log.record(TransactionRecord::End);
        assert_eq!(log.undo_len(), 1);
    }
}
