//! Time-ordered queue of scheduled timers.
//!
//! Buckets are kept strictly ascending by trigger time. Each bucket holds every
//! timer sharing that trigger time; the most recently scheduled timer is the
//! bucket head and fires first.

use std::collections::VecDeque;

use super::error::ClockError;
use super::timer::TimerId;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bucket {
    trigger_at: u64,
    /// Head is the last element.
    timers: Vec<TimerId>,
}

#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    buckets: VecDeque<Bucket>,
    len: usize,
}

impl TimerQueue {
    /// Binary search for the bucket at `trigger_at`.
    ///
    /// `Ok` is the existing bucket, `Err` the insertion point for a new one.
    pub fn find_entry_position(&self, trigger_at: u64) -> Result<usize, usize> {
        self.buckets
            .binary_search_by_key(&trigger_at, |bucket| bucket.trigger_at)
    }

    /// Schedule `timer` at `trigger_at` as the new head of its bucket.
    pub fn insert(&mut self, trigger_at: u64, timer: TimerId) {
        match self.find_entry_position(trigger_at) {
            Ok(idx) => self.buckets[idx].timers.push(timer),
            Err(idx) => self.buckets.insert(
                idx,
                Bucket {
                    trigger_at,
                    timers: vec![timer],
                },
            ),
        }
        self.len += 1;
    }

    /// Unschedule `timer`, which must sit in the bucket at `trigger_at`.
    pub fn remove(&mut self, trigger_at: u64, timer: TimerId) -> Result<(), ClockError> {
        let idx = self.find_entry_position(trigger_at).map_err(|_| {
            ClockError::queue_corrupted(format!(
                "no bucket at {} for timer {:?}",
                trigger_at, timer
            ))
        })?;

        let bucket = &mut self.buckets[idx];
        let pos = bucket
            .timers
            .iter()
            .rposition(|&id| id == timer)
            .ok_or_else(|| {
                ClockError::queue_corrupted(format!(
                    "timer {:?} missing from bucket at {}",
                    timer, trigger_at
                ))
            })?;
        bucket.timers.remove(pos);

        if bucket.timers.is_empty() {
            self.buckets.remove(idx);
        }
        self.len -= 1;
        Ok(())
    }

    /// Take the head of the front bucket if it is due at `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<TimerId> {
        let front = self.buckets.front_mut()?;
        if front.trigger_at > now {
            return None;
        }

        let timer = front.timers.pop();
        if front.timers.is_empty() {
            self.buckets.pop_front();
        }
        if timer.is_some() {
            self.len -= 1;
        }
        timer
    }

    /// Timers due at `trigger_at`, in firing order.
    pub fn timers_at(&self, trigger_at: u64) -> Vec<TimerId> {
        match self.find_entry_position(trigger_at) {
            Ok(idx) => self.buckets[idx].timers.iter().rev().copied().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn next_trigger_at(&self) -> Option<u64> {
        self.buckets.front().map(|bucket| bucket.trigger_at)
    }

    #[cfg(test)]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(count: usize) -> Vec<TimerId> {
        let mut arena: SlotMap<TimerId, ()> = SlotMap::with_key();
        (0..count).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn buckets_stay_sorted() {
        let t = ids(3);
        let mut queue = TimerQueue::default();
        queue.insert(30, t[0]);
        queue.insert(10, t[1]);
        queue.insert(20, t[2]);

        assert_eq!(queue.next_trigger_at(), Some(10));
        assert_eq!(queue.find_entry_position(20), Ok(1));
        assert_eq!(queue.find_entry_position(25), Err(2));
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn equal_trigger_shares_bucket_lifo() {
        let t = ids(3);
        let mut queue = TimerQueue::default();
        for &id in &t {
            queue.insert(5, id);
        }

        assert_eq!(queue.bucket_count(), 1);
        assert_eq!(queue.timers_at(5), vec![t[2], t[1], t[0]]);
        assert_eq!(queue.pop_due(5), Some(t[2]));
        assert_eq!(queue.pop_due(5), Some(t[1]));
        assert_eq!(queue.pop_due(5), Some(t[0]));
        assert_eq!(queue.pop_due(5), None);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.bucket_count(), 0);
    }

    #[test]
    fn pop_due_respects_time() {
        let t = ids(1);
        let mut queue = TimerQueue::default();
        queue.insert(7, t[0]);

        assert_eq!(queue.pop_due(6), None);
        assert_eq!(queue.pop_due(8), Some(t[0]));
    }

    #[test]
    fn remove_head_and_middle() {
        let t = ids(3);
        let mut queue = TimerQueue::default();
        for &id in &t {
            queue.insert(9, id);
        }

        queue.remove(9, t[2]).unwrap();
        assert_eq!(queue.timers_at(9), vec![t[1], t[0]]);
        queue.remove(9, t[0]).unwrap();
        assert_eq!(queue.timers_at(9), vec![t[1]]);
        queue.remove(9, t[1]).unwrap();
        assert_eq!(queue.bucket_count(), 0);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn remove_missing_timer_is_corruption() {
        let t = ids(2);
        let mut queue = TimerQueue::default();
        queue.insert(3, t[0]);

        let err = queue.remove(4, t[0]).unwrap_err();
        assert!(matches!(err, ClockError::QueueCorrupted(_)));
        let err = queue.remove(3, t[1]).unwrap_err();
        assert!(matches!(err, ClockError::QueueCorrupted(_)));
        assert_eq!(queue.len(), 1);
    }
}
