//! Game timers
//!
//! Timers live in the clock's slot arena and are addressed by [`TimerId`].
//! A timer is either unscheduled or scheduled at an absolute timestamp, in
//! which case it also sits in the [`TimerQueue`](super::queue::TimerQueue)
//! bucket for that timestamp.
//!
//! Repetitions: 0 repeats forever, 1 fires once, n > 1 fires n times.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotmap::new_key_type;

use super::error::ClockError;
use super::events::{ClockEvent, SubscriptionId, Topic};
use super::GameClock;

new_key_type! {
    /// Handle to a timer owned by a [`GameClock`].
    pub struct TimerId;
}

// =============================================================================
// Options
// =============================================================================

/// Timer creation options. Negative values are clamped to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerOptions {
    /// Minutes between start and firing
    pub delay: i64,
    /// 0 = unlimited, 1 = one-shot
    pub repetitions: i64,
    /// Payload handed to listeners
    pub data: Option<Value>,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            delay: 0,
            repetitions: 1,
            data: None,
        }
    }
}

impl TimerOptions {
    pub fn new(delay: i64) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn repetitions(mut self, repetitions: i64) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

// =============================================================================
// GameTimer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GameTimer {
    delay: u64,
    repetitions: u64,
    trigger_at: Option<u64>,
    data: Option<Value>,
    /// Dropped by the clock as soon as it is unscheduled
    detached: bool,
}

impl GameTimer {
    fn new(options: TimerOptions, detached: bool) -> Self {
        Self {
            delay: clamp(options.delay),
            repetitions: clamp(options.repetitions),
            trigger_at: None,
            data: options.data,
            detached,
        }
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn repetitions(&self) -> u64 {
        self.repetitions
    }

    /// Timestamp of the next firing, `None` while unscheduled.
    pub fn trigger_at(&self) -> Option<u64> {
        self.trigger_at
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_scheduled(&self) -> bool {
        self.trigger_at.is_some()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Account for one firing. Returns whether the timer should be re-armed.
    fn consume_repetition(&mut self) -> bool {
        match self.repetitions {
            0 => true,
            1 => false,
            _ => {
                self.repetitions -= 1;
                true
            }
        }
    }
}

fn clamp(value: i64) -> u64 {
    value.max(0) as u64
}

// =============================================================================
// GameClock timer operations
// =============================================================================

impl GameClock {
    /// Create an unscheduled timer. It stays addressable until `remove_timer`.
    pub fn create_timer(&mut self, options: TimerOptions) -> TimerId {
        let id = self.timers.insert(GameTimer::new(options, false));
        tracing::debug!(timer = ?id, "Created timer");
        id
    }

    /// Create a timer, attach `listener` and start it immediately.
    pub fn create_timer_with(
        &mut self,
        options: TimerOptions,
        listener: impl FnMut(&mut GameClock, &ClockEvent) + 'static,
    ) -> Result<TimerId, ClockError> {
        let id = self.create_timer(options);
        self.events.subscribe(Topic::Timer(id), Box::new(listener));
        self.start_timer(id, true)?;
        Ok(id)
    }

    /// One-shot timer that is discarded after it fires or is stopped.
    pub fn set_timeout(
        &mut self,
        delay: i64,
        data: Option<Value>,
        listener: impl FnMut(&mut GameClock, &ClockEvent) + 'static,
    ) -> Result<TimerId, ClockError> {
        let options = TimerOptions {
            delay,
            repetitions: 1,
            data,
        };
        self.start_detached(options, Box::new(listener))
    }

    /// Endlessly repeating timer that is discarded once stopped.
    pub fn set_interval(
        &mut self,
        delay: i64,
        data: Option<Value>,
        listener: impl FnMut(&mut GameClock, &ClockEvent) + 'static,
    ) -> Result<TimerId, ClockError> {
        let options = TimerOptions {
            delay,
            repetitions: 0,
            data,
        };
        self.start_detached(options, Box::new(listener))
    }

    fn start_detached(
        &mut self,
        options: TimerOptions,
        listener: super::events::Listener,
    ) -> Result<TimerId, ClockError> {
        let id = self.timers.insert(GameTimer::new(options, true));
        self.events.subscribe(Topic::Timer(id), listener);
        self.start_timer(id, true)?;
        Ok(id)
    }

    /// Attach another listener to a timer.
    pub fn on_timer(
        &mut self,
        id: TimerId,
        listener: impl FnMut(&mut GameClock, &ClockEvent) + 'static,
    ) -> Result<SubscriptionId, ClockError> {
        if !self.timers.contains_key(id) {
            return Err(ClockError::UnknownTimer(id));
        }
        Ok(self.events.subscribe(Topic::Timer(id), Box::new(listener)))
    }

    /// Schedule a timer `delay` minutes from now. No-op if already scheduled.
    ///
    /// With `immediate` set, a zero-delay timer fires before this returns and
    /// never enters the queue.
    pub fn start_timer(&mut self, id: TimerId, immediate: bool) -> Result<(), ClockError> {
        let timer = self.timers.get(id).ok_or(ClockError::UnknownTimer(id))?;
        if timer.is_scheduled() {
            return Ok(());
        }
        if timer.delay == 0 && immediate {
            return self.fire(id);
        }
        let trigger_at = self.current() + timer.delay;
        self.schedule(id, trigger_at);
        Ok(())
    }

    /// Unschedule a timer. Detached timers are discarded.
    ///
    /// # Errors
    ///
    /// `ClockError::QueueCorrupted` if the timer is not in the bucket its
    /// trigger time points at.
    pub fn stop_timer(&mut self, id: TimerId) -> Result<(), ClockError> {
        let timer = self.timers.get(id).ok_or(ClockError::UnknownTimer(id))?;
        let detached = timer.detached;
        if let Some(trigger_at) = timer.trigger_at {
            self.unschedule(id, trigger_at)?;
        }
        if detached {
            self.drop_timer(id);
        }
        Ok(())
    }

    /// Stop a timer, detach its listeners and release it.
    pub fn remove_timer(&mut self, id: TimerId) -> Result<GameTimer, ClockError> {
        let timer = self.timers.get(id).ok_or(ClockError::UnknownTimer(id))?;
        if let Some(trigger_at) = timer.trigger_at {
            self.unschedule(id, trigger_at)?;
        }
        self.events.unsubscribe_topic(Topic::Timer(id));
        self.timers.remove(id).ok_or(ClockError::UnknownTimer(id))
    }

    /// Change the delay. A running timer keeps the time it has already waited.
    pub fn set_timer_delay(&mut self, id: TimerId, delay: i64) -> Result<(), ClockError> {
        let delay = clamp(delay);
        let current = self.current();
        let timer = self.timers.get_mut(id).ok_or(ClockError::UnknownTimer(id))?;
        let old_delay = std::mem::replace(&mut timer.delay, delay);

        let Some(trigger_at) = timer.trigger_at else {
            return Ok(());
        };
        let started_at = trigger_at.saturating_sub(old_delay);
        let waited = current.saturating_sub(started_at);
        let new_trigger_at = current + delay.saturating_sub(waited);
        if new_trigger_at != trigger_at {
            self.unschedule(id, trigger_at)?;
            self.schedule(id, new_trigger_at);
        }
        Ok(())
    }

    pub fn set_timer_repetitions(&mut self, id: TimerId, repetitions: i64) -> Result<(), ClockError> {
        let timer = self.timers.get_mut(id).ok_or(ClockError::UnknownTimer(id))?;
        timer.repetitions = clamp(repetitions);
        Ok(())
    }

    pub fn set_timer_data(&mut self, id: TimerId, data: Option<Value>) -> Result<(), ClockError> {
        let timer = self.timers.get_mut(id).ok_or(ClockError::UnknownTimer(id))?;
        timer.data = data;
        Ok(())
    }

    pub fn timer(&self, id: TimerId) -> Option<&GameTimer> {
        self.timers.get(id)
    }

    /// Timers due at `trigger_at`, in the order they will fire.
    pub fn timers_at(&self, trigger_at: u64) -> Vec<TimerId> {
        self.queue.timers_at(trigger_at)
    }

    pub fn scheduled_timer_count(&self) -> usize {
        self.queue.len()
    }

    pub fn next_trigger_at(&self) -> Option<u64> {
        self.queue.next_trigger_at()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn schedule(&mut self, id: TimerId, trigger_at: u64) {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.trigger_at = Some(trigger_at);
            self.queue.insert(trigger_at, id);
            tracing::trace!(timer = ?id, trigger_at, "Scheduled timer");
        }
    }

    fn unschedule(&mut self, id: TimerId, trigger_at: u64) -> Result<(), ClockError> {
        self.queue.remove(trigger_at, id)?;
        if let Some(timer) = self.timers.get_mut(id) {
            timer.trigger_at = None;
        }
        Ok(())
    }

    fn drop_timer(&mut self, id: TimerId) {
        self.events.unsubscribe_topic(Topic::Timer(id));
        self.timers.remove(id);
        tracing::trace!(timer = ?id, "Dropped detached timer");
    }

    /// Fire an unscheduled timer: re-arm it if repetitions remain, then notify.
    fn fire(&mut self, id: TimerId) -> Result<(), ClockError> {
        let current = self.current();
        let timer = self.timers.get_mut(id).ok_or(ClockError::UnknownTimer(id))?;
        let rearm = timer.consume_repetition();
        let delay = timer.delay;
        let data = timer.data.clone();

        if rearm {
            // Zero-delay repeats go one minute out; the current bucket is being drained.
            self.schedule(id, current + delay.max(1));
        }
        tracing::trace!(timer = ?id, at = current, rearm, "Timer fired");
        self.emit(&ClockEvent::Timer { timer: id, data });

        if self
            .timers
            .get(id)
            .is_some_and(|timer| timer.detached && !timer.is_scheduled())
        {
            self.drop_timer(id);
        }
        Ok(())
    }

    /// Fire every timer due at the current timestamp, head of the front bucket
    /// first. The live queue is re-read after each firing.
    pub(super) fn process_due_timers(&mut self) -> Result<(), ClockError> {
        loop {
            let now = self.current();
            let Some(id) = self.queue.pop_due(now) else {
                return Ok(());
            };
            let timer = self.timers.get_mut(id).ok_or_else(|| {
                ClockError::queue_corrupted(format!("queued timer {:?} no longer exists", id))
            })?;
            timer.trigger_at = None;
            self.fire(id)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::test_fixtures::{recorder, short_clock, Recorder};

    fn log_firing(log: &Recorder, label: &'static str) -> impl FnMut(&mut GameClock, &ClockEvent) + 'static {
        let log = log.clone();
        move |clock: &mut GameClock, _: &ClockEvent| {
            log.borrow_mut().push(format!("{}@{}", label, clock.current()));
        }
    }

    mod options {
        use super::*;

        #[test]
        fn negative_values_clamp_to_zero() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(-5).repetitions(-2));
            let timer = clock.timer(id).unwrap();
            assert_eq!(timer.delay(), 0);
            assert_eq!(timer.repetitions(), 0);

            clock.set_timer_delay(id, -1).unwrap();
            clock.set_timer_repetitions(id, -7).unwrap();
            assert_eq!(clock.timer(id).unwrap().delay(), 0);
            assert_eq!(clock.timer(id).unwrap().repetitions(), 0);
        }

        #[test]
        fn default_is_one_shot() {
            let options = TimerOptions::default();
            assert_eq!(options.repetitions, 1);
            assert_eq!(options.delay, 0);
        }

        #[test]
        fn deserializes_with_defaults() {
            let options: TimerOptions = serde_json::from_value(json!({ "delay": 15 })).unwrap();
            assert_eq!(options, TimerOptions::new(15));
        }
    }

    mod scheduling {
        use super::*;

        #[test]
        fn zero_delay_immediate_fires_synchronously() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock
                .create_timer_with(TimerOptions::new(0), log_firing(&log, "t"))
                .unwrap();

            assert_eq!(*log.borrow(), vec!["t@0"]);
            assert!(!clock.timer(id).unwrap().is_scheduled());
            assert_eq!(clock.scheduled_timer_count(), 0);
        }

        #[test]
        fn zero_delay_deferred_waits_for_next_tick() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock.create_timer(TimerOptions::new(0));
            clock.on_timer(id, log_firing(&log, "t")).unwrap();
            clock.start_timer(id, false).unwrap();

            assert!(log.borrow().is_empty());
            assert_eq!(clock.timer(id).unwrap().trigger_at(), Some(0));
            clock.advance(1).unwrap();
            assert_eq!(*log.borrow(), vec!["t@1"]);
        }

        #[test]
        fn finite_repetitions_fire_at_each_delay() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock
                .create_timer_with(TimerOptions::new(10).repetitions(3), log_firing(&log, "t"))
                .unwrap();

            clock.advance(40).unwrap();
            assert_eq!(*log.borrow(), vec!["t@10", "t@20", "t@30"]);
            assert!(!clock.timer(id).unwrap().is_scheduled());
        }

        #[test]
        fn start_is_noop_when_scheduled() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(5));
            clock.start_timer(id, true).unwrap();
            clock.advance(2).unwrap();
            clock.start_timer(id, true).unwrap();
            assert_eq!(clock.timer(id).unwrap().trigger_at(), Some(5));
            assert_eq!(clock.scheduled_timer_count(), 1);
        }

        #[test]
        fn same_timestamp_fires_last_registered_first() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            clock
                .create_timer_with(TimerOptions::new(3), log_firing(&log, "first"))
                .unwrap();
            clock
                .create_timer_with(TimerOptions::new(3), log_firing(&log, "second"))
                .unwrap();

            assert_eq!(clock.timers_at(3).len(), 2);
            clock.advance(3).unwrap();
            assert_eq!(*log.borrow(), vec!["second@3", "first@3"]);
            assert_eq!(clock.next_trigger_at(), None);
        }

        #[test]
        fn timer_added_during_drain_at_same_timestamp_fires_same_tick() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let late = clock.create_timer(TimerOptions::new(0));
            clock.on_timer(late, log_firing(&log, "late")).unwrap();

            let starter = log.clone();
            clock
                .create_timer_with(TimerOptions::new(2), move |clock, _| {
                    starter.borrow_mut().push(format!("starter@{}", clock.current()));
                    clock.start_timer(late, false).unwrap();
                })
                .unwrap();

            clock.advance(2).unwrap();
            assert_eq!(*log.borrow(), vec!["starter@2", "late@2"]);
        }

        #[test]
        fn unknown_timer_is_an_error() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::default());
            clock.remove_timer(id).unwrap();
            assert_eq!(clock.start_timer(id, true), Err(ClockError::UnknownTimer(id)));
            assert!(clock.timer(id).is_none());
        }
    }

    mod stopping {
        use super::*;

        #[test]
        fn stop_unschedules_and_is_idempotent() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(4));
            clock.start_timer(id, true).unwrap();
            clock.stop_timer(id).unwrap();
            clock.stop_timer(id).unwrap();

            assert!(!clock.timer(id).unwrap().is_scheduled());
            assert_eq!(clock.scheduled_timer_count(), 0);
        }

        #[test]
        fn listener_can_stop_sibling_in_same_bucket() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let victim = clock
                .create_timer_with(TimerOptions::new(5), log_firing(&log, "victim"))
                .unwrap();
            let killer_log = log.clone();
            clock
                .create_timer_with(TimerOptions::new(5), move |clock, _| {
                    killer_log.borrow_mut().push("killer".to_string());
                    clock.stop_timer(victim).unwrap();
                })
                .unwrap();

            clock.advance(5).unwrap();
            assert_eq!(*log.borrow(), vec!["killer"]);
        }

        #[test]
        fn interval_can_stop_itself() {
            let (mut clock, _) = short_clock();
            let fired = Rc::new(RefCell::new(0));
            let counter = fired.clone();
            clock
                .set_interval(2, None, move |clock, event| {
                    *counter.borrow_mut() += 1;
                    if *counter.borrow() == 3 {
                        if let ClockEvent::Timer { timer, .. } = event {
                            clock.stop_timer(*timer).unwrap();
                        }
                    }
                })
                .unwrap();

            clock.advance(20).unwrap();
            assert_eq!(*fired.borrow(), 3);
            assert_eq!(clock.scheduled_timer_count(), 0);
        }

        #[test]
        fn misplaced_timer_reports_corruption() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(5));
            clock.start_timer(id, true).unwrap();
            clock.timers[id].trigger_at = Some(99);

            let err = clock.stop_timer(id).unwrap_err();
            assert!(matches!(err, ClockError::QueueCorrupted(_)));
        }
    }

    mod detached {
        use super::*;

        #[test]
        fn timeout_is_dropped_after_firing() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock
                .set_timeout(3, Some(json!({ "spell": "haste" })), log_firing(&log, "timeout"))
                .unwrap();

            assert!(clock.timer(id).unwrap().is_detached());
            clock.advance(5).unwrap();
            assert_eq!(*log.borrow(), vec!["timeout@3"]);
            assert!(clock.timer(id).is_none());
        }

        #[test]
        fn timeout_payload_reaches_listener() {
            let (mut clock, _) = short_clock();
            let seen = Rc::new(RefCell::new(None));
            let sink = seen.clone();
            clock
                .set_timeout(1, Some(json!("wake")), move |_, event| {
                    if let ClockEvent::Timer { data, .. } = event {
                        *sink.borrow_mut() = data.clone();
                    }
                })
                .unwrap();

            clock.advance(1).unwrap();
            assert_eq!(*seen.borrow(), Some(json!("wake")));
        }

        #[test]
        fn stopped_interval_is_dropped() {
            let (mut clock, _) = short_clock();
            let id = clock.set_interval(10, None, |_, _| {}).unwrap();
            clock.stop_timer(id).unwrap();
            assert!(clock.timer(id).is_none());
        }

        #[test]
        fn zero_delay_interval_rearms_one_minute_out() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock.set_interval(0, None, log_firing(&log, "i")).unwrap();

            assert_eq!(clock.timer(id).unwrap().trigger_at(), Some(1));
            clock.advance(2).unwrap();
            assert_eq!(*log.borrow(), vec!["i@0", "i@1", "i@2"]);
        }
    }

    mod moving_time {
        use super::*;

        #[test]
        fn listener_moves_clock_once_queue_is_empty() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let sink = log.clone();
            clock
                .set_timeout(3, None, move |clock, _| {
                    let moved = clock.set_current(1000).map(|_| clock.current());
                    sink.borrow_mut().push(format!("jump {:?}", moved));
                    clock
                        .set_timeout(2, None, log_firing(&sink, "follow-up"))
                        .unwrap();
                })
                .unwrap();

            clock.advance(4).unwrap();
            assert_eq!(clock.current(), 1001);
            assert_eq!(clock.next_trigger_at(), Some(1002));

            clock.advance(1).unwrap();
            assert_eq!(*log.borrow(), vec!["jump Ok(1000)", "follow-up@1002"]);
            assert_eq!(*clock.date(), clock.calendar().timestamp_to_date(1002));
        }

        #[test]
        fn listener_cannot_move_clock_while_sibling_is_queued() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            clock
                .create_timer_with(TimerOptions::new(3), log_firing(&log, "sibling"))
                .unwrap();
            let sink = log.clone();
            clock
                .create_timer_with(TimerOptions::new(3), move |clock, _| {
                    let outcome = match clock.set_current(1000) {
                        Err(ClockError::TimersPending { count }) => format!("pending {}", count),
                        other => format!("unexpected {:?}", other),
                    };
                    sink.borrow_mut().push(outcome);
                })
                .unwrap();

            clock.advance(3).unwrap();
            assert_eq!(*log.borrow(), vec!["pending 1", "sibling@3"]);
            assert_eq!(clock.current(), 3);
        }
    }

    mod delay_changes {
        use super::*;

        #[test]
        fn running_timer_keeps_elapsed_wait() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(10));
            clock.start_timer(id, true).unwrap();
            clock.advance(4).unwrap();

            clock.set_timer_delay(id, 6).unwrap();
            assert_eq!(clock.timer(id).unwrap().trigger_at(), Some(6));
            assert_eq!(clock.timers_at(10), Vec::<TimerId>::new());
        }

        #[test]
        fn shrinking_below_elapsed_fires_on_next_tick() {
            let (mut clock, _) = short_clock();
            let log = recorder();
            let id = clock
                .create_timer_with(TimerOptions::new(10), log_firing(&log, "t"))
                .unwrap();
            clock.advance(4).unwrap();

            clock.set_timer_delay(id, 2).unwrap();
            assert_eq!(clock.timer(id).unwrap().trigger_at(), Some(4));
            clock.advance(1).unwrap();
            assert_eq!(*log.borrow(), vec!["t@5"]);
        }

        #[test]
        fn unscheduled_timer_only_updates_delay() {
            let (mut clock, _) = short_clock();
            let id = clock.create_timer(TimerOptions::new(10));
            clock.set_timer_delay(id, 3).unwrap();
            assert_eq!(clock.timer(id).unwrap().delay(), 3);
            assert!(!clock.timer(id).unwrap().is_scheduled());
        }
    }

    #[test]
    fn remove_timer_unschedules_and_detaches_listeners() {
        let (mut clock, _) = short_clock();
        let log = recorder();
        let id = clock
            .create_timer_with(TimerOptions::new(2).data(json!(1)), log_firing(&log, "t"))
            .unwrap();

        let removed = clock.remove_timer(id).unwrap();
        assert_eq!(removed.data(), Some(&json!(1)));
        assert_eq!(clock.scheduled_timer_count(), 0);
        clock.advance(3).unwrap();
        assert!(log.borrow().is_empty());
    }
}
