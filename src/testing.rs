//! Test doubles for the clock's collaborators.

use std::{cell::Cell, io};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{
    alarm::{Alarm, AlarmId},
    error::{PlaybackError, StoreError},
    notify::Notifier,
    store::AlarmStore,
    time_source::TimeSource,
};

pub fn at(y: i32, m: u32, d: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub alarms: Vec<Alarm>,
    pub saves: usize,
    pub fail: bool,
}

impl MemoryStore {
    pub fn with(alarms: Vec<Alarm>) -> Self {
        Self {
            alarms,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn disk_full() -> StoreError {
        StoreError::Io {
            path: "memory".into(),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        }
    }
}

impl AlarmStore for MemoryStore {
    fn load(&self) -> Result<Vec<Alarm>, StoreError> {
        if self.fail {
            return Err(Self::disk_full());
        }
        Ok(self.alarms.clone())
    }

    fn save(&mut self, alarms: &[Alarm]) -> Result<(), StoreError> {
        if self.fail {
            return Err(Self::disk_full());
        }
        self.alarms = alarms.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Show(AlarmId),
    Play(AlarmId),
    Stop,
    Hide,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub calls: Vec<Call>,
    pub fail_play: bool,
    playing: Option<AlarmId>,
    shown: Option<AlarmId>,
}

impl RecordingNotifier {
    pub const fn playing(&self) -> Option<AlarmId> {
        self.playing
    }

    pub const fn shown(&self) -> Option<AlarmId> {
        self.shown
    }

    pub fn plays(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Play(_)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn play(&mut self, alarm: &Alarm) -> Result<(), PlaybackError> {
        self.calls.push(Call::Play(alarm.id));
        if self.fail_play {
            return Err(PlaybackError::Disconnected);
        }
        self.playing = Some(alarm.id);
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stop);
        self.playing = None;
    }

    fn show(&mut self, alarm: &Alarm) {
        self.calls.push(Call::Show(alarm.id));
        self.shown = Some(alarm.id);
    }

    fn hide(&mut self) {
        self.calls.push(Call::Hide);
        self.shown = None;
    }
}

/// a clock that only moves when told to
#[derive(Debug)]
pub struct ManualTime {
    now: Cell<NaiveDateTime>,
    pub reads: Cell<usize>,
}

impl ManualTime {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
            reads: Cell::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> NaiveDateTime {
        self.reads.set(self.reads.get() + 1);
        self.now.get()
    }
}
