//! Bounded undo and redo stacks.

use crate::operation::OperationGroup;
use std::collections::VecDeque;

/// Committed record groups, newest first.
///
/// A limit of zero means unbounded. Every operation that can drop records
/// hands them back so the caller can reclaim what they reference.
#[derive(Debug, Default)]
pub struct HistoryStack {
    records: VecDeque<OperationGroup>,
    limit: usize,
}

impl HistoryStack {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the bound, returning the records that no longer fit.
    pub fn set_limit(&mut self, limit: usize) -> Vec<OperationGroup> {
        self.limit = limit;
        self.trim()
    }

    /// Pushes a record as the newest and returns any evicted from the bottom.
    pub fn push(&mut self, group: OperationGroup) -> Vec<OperationGroup> {
        self.records.push_front(group);
        self.trim()
    }

    pub fn pop(&mut self) -> Option<OperationGroup> {
        self.records.pop_front()
    }

    pub fn peek(&self) -> Option<&OperationGroup> {
        self.records.front()
    }

    pub(crate) fn peek_mut(&mut self) -> Option<&mut OperationGroup> {
        self.records.front_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &OperationGroup> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut OperationGroup> {
        self.records.iter_mut()
    }

    /// Command names, newest first.
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|g| g.command().to_string()).collect()
    }

    pub fn clear(&mut self) -> Vec<OperationGroup> {
        self.records.drain(..).collect()
    }

    /// Removes every record for which `pred` holds.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&OperationGroup) -> bool) -> Vec<OperationGroup> {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.records.len());
        for group in self.records.drain(..) {
            if pred(&group) {
                removed.push(group);
            } else {
                kept.push_back(group);
            }
        }
        self.records = kept;
        removed
    }

    /// Takes the whole stack, leaving an empty one with the same bound.
    pub(crate) fn take(&mut self) -> HistoryStack {
        HistoryStack {
            records: std::mem::take(&mut self.records),
            limit: self.limit,
        }
    }

    fn trim(&mut self) -> Vec<OperationGroup> {
        if self.limit == 0 || self.records.len() <= self.limit {
            return Vec::new();
        }
        self.records.split_off(self.limit).into()
    }
}
