//! The alarm evaluator.
//!
//! [`Clock`] owns the alarm list and the ringing state. An external loop calls
//! [`Clock::tick`] about once a second. Every other method is a user action
//! such as creating, toggling, snoozing or dismissing an alarm. Changes to the
//! list are written to the [`AlarmStore`] right away. Sound and on-screen
//! notification go through the [`Notifier`].

use std::{
    collections::{HashMap, VecDeque},
    fmt,
};

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{Alarm, AlarmId, RepeatRule},
    alarm_edit::{AlarmBuilder, AlarmEdit},
    config::Config,
    error::AlarmError,
    notify::Notifier,
    store::AlarmStore,
};

/// how many past events [`Clock::history`] keeps
pub const HISTORY_LEN: usize = 100;

/// what happens to a `once` alarm after it goes off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OncePolicy {
    /// switch it off when it fires, so it rings once ever
    #[default]
    Deactivate,
    /// leave it on, it rings again the next day like a daily alarm
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub snooze: Duration,
    /// `None` rings until dismissed
    pub ring_timeout: Option<Duration>,
    pub once_policy: OncePolicy,
    /// sound for alarms created without one
    pub default_sound: String,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().settings()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// switched off
    Idle,
    /// on, waiting for its time
    Armed,
    Ringing,
    /// on, but held off until the snooze runs out
    Snoozed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Triggered,
    Snoozed,
    /// stopped by the user, or deleted while ringing
    Dismissed,
    /// stopped after ringing for the configured timeout
    TimedOut,
    /// stopped because it was switched off or rescheduled while ringing
    Silenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmEvent {
    pub alarm_id: AlarmId,
    pub kind: EventKind,
    pub at: NaiveDateTime,
}

impl fmt::Display for AlarmEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "alarm {} {:?} at {}",
            self.alarm_id,
            self.kind,
            self.at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ringing {
    id: AlarmId,
    since: NaiveDateTime,
    silence_at: Option<NaiveDateTime>,
    /// sound hasn't started yet, audio locked or `play` failed
    sound_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
}

pub struct Clock<S, N> {
    alarms: Vec<Alarm>,
    store: S,
    notifier: N,
    settings: Settings,
    ringing: Option<Ringing>,
    /// alarm id to the time its snooze runs out
    snoozed: HashMap<AlarmId, NaiveDateTime>,
    /// alarms that already went off in the current minute
    fired: HashMap<AlarmId, NaiveDateTime>,
    audio_unlocked: bool,
    last_tick: Option<NaiveDateTime>,
    history: VecDeque<AlarmEvent>,
}

impl<S: AlarmStore, N: Notifier> Clock<S, N> {
    /// loads the alarms from `store`, if that fails the clock starts with none
    pub fn new(store: S, notifier: N, settings: Settings) -> Self {
        let mut alarms = store.load().unwrap_or_else(|e| {
            log::error!("couldn't load alarms, starting without any: {e}");
            vec![]
        });
        for alarm in alarms.iter_mut().filter(|alarm| alarm.sound.is_empty()) {
            alarm.sound.clone_from(&settings.default_sound);
        }
        log::info!("loaded {} alarms", alarms.len());
        Self {
            alarms,
            store,
            notifier,
            settings,
            ringing: None,
            snoozed: HashMap::new(),
            fired: HashMap::new(),
            audio_unlocked: true,
            last_tick: None,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// until [`Clock::unlock_audio`] is called, ringing alarms are only shown
    pub fn lock_audio(&mut self) {
        self.audio_unlocked = false;
    }

    /// lets sound play, a ringing alarm starts its sound on the next tick
    pub fn unlock_audio(&mut self) {
        if !self.audio_unlocked {
            log::info!("audio unlocked");
        }
        self.audio_unlocked = true;
    }

    /// evaluates every alarm against `now` and returns what happened
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<AlarmEvent> {
        let mut events = vec![];
        let minute = start_of_minute(now);
        self.last_tick = Some(now);
        self.snoozed.retain(|id, until| {
            let snoozing = *until > now;
            if !snoozing {
                log::debug!("alarm {id} snooze is over");
            }
            snoozing
        });
        self.fired.retain(|_, fired_at| *fired_at == minute);

        if let Some(ringing) = self.ringing {
            if ringing.silence_at.is_some_and(|at| at <= now) {
                self.silence();
                events.push(self.record(ringing.id, EventKind::TimedOut, now));
            } else if ringing.sound_pending && self.audio_unlocked {
                self.start_sound(ringing.id);
            }
        }
        if self.ringing.is_none() {
            events.extend(self.trigger_due(now, minute));
        }
        events
    }

    fn trigger_due(&mut self, now: NaiveDateTime, minute: NaiveDateTime) -> Option<AlarmEvent> {
        let index = self.alarms.iter().position(|alarm| {
            alarm.is_due(&now)
                && !self.snoozed.contains_key(&alarm.id)
                && !self.fired.contains_key(&alarm.id)
        })?;
        let id = self.alarms[index].id;
        log::info!("alarm {id} ({}) going off", self.alarms[index].name);
        self.fired.insert(id, minute);
        self.ringing = Some(Ringing {
            id,
            since: now,
            silence_at: self.settings.ring_timeout.map(|timeout| now + timeout),
            sound_pending: true,
        });
        self.notifier.show(&self.alarms[index]);
        if self.audio_unlocked {
            self.start_sound(id);
        } else {
            log::info!("audio is locked, alarm {id} is only shown");
        }
        if self.alarms[index].repeat == RepeatRule::Once
            && self.settings.once_policy == OncePolicy::Deactivate
        {
            self.alarms[index].active = false;
            self.persist();
        }
        Some(self.record(id, EventKind::Triggered, now))
    }

    fn start_sound(&mut self, id: AlarmId) {
        let Some(alarm) = self.alarms.iter().find(|alarm| alarm.id == id) else {
            return;
        };
        let pending = match self.notifier.play(alarm) {
            Ok(()) => false,
            Err(e) => {
                log::warn!("couldn't play sound for alarm {id}, retrying next tick: {e}");
                true
            }
        };
        if let Some(ringing) = &mut self.ringing {
            ringing.sound_pending = pending;
        }
    }

    /// stops whatever is ringing
    fn silence(&mut self) -> Option<Ringing> {
        let ringing = self.ringing.take()?;
        self.notifier.stop();
        self.notifier.hide();
        Some(ringing)
    }

    /// silences `id` if it is the ringing alarm and records why
    fn stop_ringing(&mut self, id: AlarmId, kind: EventKind) -> Option<NaiveDateTime> {
        if !self.is_ringing(id) {
            return None;
        }
        let ringing = self.silence()?;
        let at = self.last_tick.unwrap_or(ringing.since);
        self.record(id, kind, at);
        Some(at)
    }

    fn record(&mut self, alarm_id: AlarmId, kind: EventKind, at: NaiveDateTime) -> AlarmEvent {
        let event = AlarmEvent { alarm_id, kind, at };
        log::info!("{event}");
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(event);
        event
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.alarms) {
            log::error!("couldn't save alarms, changes are only kept in memory: {e}");
        }
    }

    fn next_id(&self) -> AlarmId {
        self.alarms.iter().map(|alarm| alarm.id).max().unwrap_or_default() + 1
    }

    /// adds a new alarm, switched on
    pub fn create(&mut self, builder: AlarmBuilder) -> Result<AlarmId, AlarmError> {
        let id = self.next_id();
        let mut alarm = builder.build(id)?;
        if alarm.sound.is_empty() {
            alarm.sound.clone_from(&self.settings.default_sound);
        }
        log::info!("created alarm {id} at {}", alarm.time);
        self.alarms.push(alarm);
        self.persist();
        Ok(id)
    }

    /// changes one field of an alarm, returns false if there is no such alarm
    pub fn edit(&mut self, id: AlarmId, edit: AlarmEdit) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return false;
        };
        let disabling = edit == AlarmEdit::Enable(false);
        if edit.apply(alarm) {
            if disabling {
                self.snoozed.remove(&id);
            }
            self.stop_ringing(id, EventKind::Silenced);
        }
        self.persist();
        true
    }

    /// flips an alarm on or off and returns its new state
    pub fn toggle_active(&mut self, id: AlarmId) -> Option<bool> {
        let alarm = self.alarms.iter_mut().find(|alarm| alarm.id == id)?;
        alarm.active = !alarm.active;
        let active = alarm.active;
        if !active {
            self.snoozed.remove(&id);
            self.stop_ringing(id, EventKind::Silenced);
        }
        self.persist();
        Some(active)
    }

    /// stops the ringing alarm and holds it off for `delay` from the last tick
    ///
    /// once the delay is over the alarm goes off again the next time its schedule matches
    pub fn snooze(&mut self, id: AlarmId, delay: Duration) -> bool {
        let Some(at) = self.stop_ringing(id, EventKind::Snoozed) else {
            log::debug!("alarm {id} isn't ringing, nothing to snooze");
            return false;
        };
        self.snoozed.insert(id, at + delay);
        true
    }

    /// snoozes whatever is ringing for the configured snooze time
    pub fn snooze_ringing(&mut self) -> bool {
        let delay = self.settings.snooze;
        self.ringing().is_some_and(|id| self.snooze(id, delay))
    }

    /// stops the ringing alarm
    pub fn dismiss(&mut self, id: AlarmId) -> bool {
        self.stop_ringing(id, EventKind::Dismissed).is_some()
    }

    pub fn dismiss_ringing(&mut self) -> bool {
        self.ringing().is_some_and(|id| self.dismiss(id))
    }

    /// removes an alarm, stopping it first if it is ringing
    pub fn delete(&mut self, id: AlarmId) -> Option<Alarm> {
        let index = self.alarms.iter().position(|alarm| alarm.id == id)?;
        self.stop_ringing(id, EventKind::Dismissed);
        self.snoozed.remove(&id);
        self.fired.remove(&id);
        let removed = self.alarms.remove(index);
        log::info!("deleted alarm {id}");
        self.persist();
        Some(removed)
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn alarm(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    /// the id of the alarm that is ringing right now
    #[must_use]
    pub fn ringing(&self) -> Option<AlarmId> {
        self.ringing.map(|ringing| ringing.id)
    }

    fn is_ringing(&self, id: AlarmId) -> bool {
        self.ringing() == Some(id)
    }

    #[must_use]
    pub fn state(&self, id: AlarmId) -> Option<AlarmState> {
        let alarm = self.alarm(id)?;
        Some(if self.is_ringing(id) {
            AlarmState::Ringing
        } else if self.snoozed.contains_key(&id) {
            AlarmState::Snoozed
        } else if alarm.active {
            AlarmState::Armed
        } else {
            AlarmState::Idle
        })
    }

    #[must_use]
    pub const fn audio_unlocked(&self) -> bool {
        self.audio_unlocked
    }

    /// oldest first
    pub fn history(&self) -> impl Iterator<Item = &AlarmEvent> {
        self.history.iter()
    }

    /// active alarms in the order they will go off after `now`
    #[must_use]
    pub fn upcoming(&self, now: &NaiveDateTime) -> Vec<(&Alarm, NaiveDateTime)> {
        let mut upcoming: Vec<_> = self
            .alarms
            .iter()
            .filter_map(|alarm| alarm.next_occurrence(now).map(|at| (alarm, at)))
            .collect();
        upcoming.sort_by_key(|(alarm, at)| (*at, alarm.id));
        upcoming
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            total: self.alarms.len(),
            active: self.alarms.iter().filter(|alarm| alarm.active).count(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

fn start_of_minute(now: NaiveDateTime) -> NaiveDateTime {
    now.with_second(0)
        .and_then(|now| now.with_nanosecond(0))
        .unwrap_or(now)
}
