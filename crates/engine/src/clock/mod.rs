//! Virtual game clock
//!
//! The clock turns a host polling loop into a discrete timeline of game
//! minutes. Each call to [`GameClock::update`] converts the real time elapsed
//! since the last tick into whole ticks; every tick advances the timestamp by
//! one minute, emits rollover events and fires due timers.
//!
//! ## Tick order
//!
//! 1. Timestamp and cached date advance by one minute.
//! 2. Rollover events: minute, then hour, day, and on a month change either
//!    month alone or year followed by month.
//! 3. Due timers fire, head of the earliest bucket first.
//!
//! Listeners run synchronously with mutable access to the clock.

mod config;
mod error;
mod events;
mod queue;
mod timer;

use std::fmt;
use std::sync::Arc;

use abduction_domain::{Calendar, GameDate, Month, NormalizedGameDate, TemperatureRange};
use slotmap::SlotMap;

use crate::infrastructure::ports::ClockPort;

pub use config::{ClockConfig, CurrentConfig, TickDelays, TickDelaysConfig, TickMode};
pub use error::ClockError;
pub use events::{ClockEvent, Listener, RolloverKind, SubscriptionId};
pub use timer::{GameTimer, TimerId, TimerOptions};

use config::{ResolvedConfig, ADJUSTMENT_HOURS};
use events::{EventBus, Topic};
use queue::TimerQueue;

pub struct GameClock {
    wall: Arc<dyn ClockPort>,
    calendar: Calendar,
    tick_delays: TickDelays,
    /// Real milliseconds per game minute; 0 = paused
    tick_delay: u64,
    /// Wall-clock baseline the next tick is measured from
    last_tick_instant: u64,
    /// Cached date, always equal to `calendar.timestamp_to_date(date.timestamp)`
    date: NormalizedGameDate,
    hourly_adjustment: [f64; ADJUSTMENT_HOURS],
    timers: SlotMap<TimerId, GameTimer>,
    queue: TimerQueue,
    events: EventBus,
    /// Set while `update` is running ticks
    updating: bool,
}

impl GameClock {
    /// Build a clock from configuration, measuring real time with `wall`.
    pub fn new(config: &ClockConfig, wall: Arc<dyn ClockPort>) -> Result<Self, ClockError> {
        let resolved = config.resolve()?;
        let now = wall.now_millis();
        let date = resolved.calendar.timestamp_to_date(resolved.current);

        tracing::debug!(
            months = resolved.calendar.months().len(),
            tick_delay = resolved.tick_delay,
            current = resolved.current,
            "Game clock created"
        );

        Ok(Self {
            wall,
            calendar: resolved.calendar,
            tick_delays: resolved.tick_delays,
            tick_delay: resolved.tick_delay,
            last_tick_instant: now,
            date,
            hourly_adjustment: resolved.hourly_adjustment,
            timers: SlotMap::with_key(),
            queue: TimerQueue::default(),
            events: EventBus::default(),
            updating: false,
        })
    }

    /// Replace calendar, tick rates, current time and temperature table.
    ///
    /// All-or-nothing: on error the clock is unchanged.
    ///
    /// # Errors
    ///
    /// - `ClockError::TimersPending` if any timer is scheduled
    /// - `ClockError::Domain` for invalid configuration
    pub fn configure(&mut self, config: &ClockConfig) -> Result<(), ClockError> {
        self.ensure_no_pending("configure")?;
        let resolved = config.resolve()?;
        self.install(resolved);
        Ok(())
    }

    fn install(&mut self, resolved: ResolvedConfig) {
        self.date = resolved.calendar.timestamp_to_date(resolved.current);
        self.calendar = resolved.calendar;
        self.tick_delays = resolved.tick_delays;
        self.tick_delay = resolved.tick_delay;
        self.hourly_adjustment = resolved.hourly_adjustment;
        self.last_tick_instant = self.wall.now_millis();
        tracing::debug!(
            months = self.calendar.months().len(),
            tick_delay = self.tick_delay,
            current = self.current(),
            "Game clock reconfigured"
        );
    }

    /// Snapshot that `configure` accepts and that reproduces this state.
    pub fn config(&self) -> ClockConfig {
        ClockConfig {
            calendar: self.calendar.config(),
            tick_delays: self.tick_delays.into(),
            tick_delay: self.tick_delay.into(),
            current: CurrentConfig::Timestamp(self.current()),
            hourly_temperature_adjustment: self.hourly_adjustment.to_vec(),
        }
    }

    // =========================================================================
    // Date
    // =========================================================================

    /// Minutes since epoch
    pub fn current(&self) -> u64 {
        self.date.timestamp
    }

    pub fn date(&self) -> &NormalizedGameDate {
        &self.date
    }

    /// The month the current date falls in.
    pub fn month_entry(&self) -> &Month {
        &self.calendar.months()[self.date.month]
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Jump to `timestamp` without emitting rollovers.
    ///
    /// # Errors
    ///
    /// `ClockError::TimersPending` while any timer is scheduled.
    pub fn set_current(&mut self, timestamp: u64) -> Result<(), ClockError> {
        self.ensure_no_pending("set current time")?;
        self.date = self.calendar.timestamp_to_date(timestamp);
        self.last_tick_instant = self.wall.now_millis();
        tracing::debug!(current = timestamp, date = %self.date, "Clock moved");
        Ok(())
    }

    /// Jump to a (possibly unnormalized) date.
    pub fn set_current_date(&mut self, date: &GameDate) -> Result<(), ClockError> {
        self.ensure_no_pending("set current date")?;
        let timestamp = self.calendar.date_to_timestamp(date)?;
        self.set_current(timestamp)
    }

    fn ensure_no_pending(&self, operation: &str) -> Result<(), ClockError> {
        let count = self.queue.len();
        if count > 0 {
            tracing::warn!(operation, count, "Rejected: timers are scheduled");
            return Err(ClockError::TimersPending { count });
        }
        Ok(())
    }

    // =========================================================================
    // Tick rate
    // =========================================================================

    pub fn tick_delay(&self) -> u64 {
        self.tick_delay
    }

    pub fn tick_delays(&self) -> TickDelays {
        self.tick_delays
    }

    /// Set real milliseconds per game minute. Leaving pause restarts the
    /// measurement from now, so paused time is never caught up.
    pub fn set_tick_delay(&mut self, delay_ms: u64) {
        if self.tick_delay == 0 && delay_ms > 0 {
            self.last_tick_instant = self.wall.now_millis();
        }
        self.tick_delay = delay_ms;
        tracing::debug!(tick_delay = delay_ms, "Tick delay changed");
    }

    pub fn set_tick_mode(&mut self, mode: TickMode) {
        self.set_tick_delay(self.tick_delays.get(mode));
    }

    /// The named mode matching the current delay, if any.
    pub fn tick_mode(&self) -> Option<TickMode> {
        self.tick_delays.mode_of(self.tick_delay)
    }

    pub fn is_paused(&self) -> bool {
        self.tick_delay == 0
    }

    // =========================================================================
    // Advancing
    // =========================================================================

    /// Run every tick that has come due since the last call.
    ///
    /// Returns the number of ticks run. A span of real time split across any
    /// number of calls produces the same ticks as one call. Calls made from a
    /// listener while ticks are running return 0.
    pub fn update(&mut self) -> Result<u64, ClockError> {
        let now = self.wall.now_millis();
        if self.updating {
            return Ok(0);
        }
        if self.tick_delay == 0 {
            self.last_tick_instant = now;
            return Ok(0);
        }

        self.updating = true;
        let result = self.run_due_ticks(now);
        self.updating = false;
        result
    }

    fn run_due_ticks(&mut self, now: u64) -> Result<u64, ClockError> {
        let mut elapsed = now.saturating_sub(self.last_tick_instant);
        let mut ticks = 0;

        // Tick delay is re-read every iteration; listeners may change it.
        while self.tick_delay > 0 && elapsed >= self.tick_delay {
            elapsed -= self.tick_delay;
            let baseline = now - elapsed;
            self.last_tick_instant = baseline;
            self.handle_tick()?;
            ticks += 1;
            if self.last_tick_instant != baseline {
                // A listener moved the clock; the remaining backlog is void.
                return Ok(ticks);
            }
        }

        self.last_tick_instant = if self.tick_delay == 0 {
            now
        } else {
            now - elapsed
        };
        if ticks > 0 {
            tracing::trace!(ticks, current = self.current(), "Clock advanced");
        }
        Ok(ticks)
    }

    /// Skip ahead `minutes` ticks at once; events and timers fire as if polled.
    pub fn advance(&mut self, minutes: u64) -> Result<(), ClockError> {
        for _ in 0..minutes {
            self.handle_tick()?;
        }
        Ok(())
    }

    fn handle_tick(&mut self) -> Result<(), ClockError> {
        let mut rollovers = vec![RolloverKind::Minute];
        let date = &mut self.date;
        date.timestamp += 1;
        date.minute += 1;

        if date.minute == 60 {
            date.minute = 0;
            date.hour += 1;
            rollovers.push(RolloverKind::Hour);

            if date.hour == 24 {
                date.hour = 0;
                date.day += 1;
                rollovers.push(RolloverKind::Day);

                let months = self.calendar.months();
                if date.day > months[date.month].days() {
                    date.day = 1;
                    date.month += 1;
                    if date.month == months.len() {
                        date.month = 0;
                        date.year += 1;
                        rollovers.push(RolloverKind::Year);
                    }
                    date.month_name = months[date.month].name().to_string();
                    rollovers.push(RolloverKind::Month);
                }
            }
        }

        debug_assert_eq!(
            self.date,
            self.calendar.timestamp_to_date(self.date.timestamp),
            "cached date drifted from timestamp"
        );

        let snapshot = self.date.clone();
        for kind in rollovers {
            self.emit(&ClockEvent::Rollover {
                kind,
                date: snapshot.clone(),
            });
        }

        self.process_due_timers()
    }

    // =========================================================================
    // Readouts
    // =========================================================================

    /// Current month's temperature range shifted by the adjustment for this hour.
    pub fn temperature_range(&self) -> TemperatureRange {
        let base = self.month_entry().temperature();
        let adjustment = self.hourly_adjustment[self.date.hour as usize % ADJUSTMENT_HOURS];
        TemperatureRange {
            min: base.min + adjustment,
            max: base.max + adjustment,
        }
    }

    pub fn hourly_temperature_adjustment(&self) -> &[f64; ADJUSTMENT_HOURS] {
        &self.hourly_adjustment
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn subscribe(
        &mut self,
        kind: RolloverKind,
        listener: impl FnMut(&mut GameClock, &ClockEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(Topic::Rollover(kind), Box::new(listener))
    }

    /// Remove a rollover or timer listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Deliver `event` to its listeners in registration order.
    ///
    /// A listener that is already running further up the stack is skipped.
    pub(crate) fn emit(&mut self, event: &ClockEvent) {
        for id in self.events.subscribers(event.topic()) {
            if let Some(mut listener) = self.events.take(id) {
                listener(self, event);
                self.events.restore(id, listener);
            }
        }
    }
}

impl fmt::Debug for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameClock")
            .field("date", &self.date)
            .field("tick_delay", &self.tick_delay)
            .field("last_tick_instant", &self.last_tick_instant)
            .field("timers", &self.timers.len())
            .field("scheduled", &self.queue.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
