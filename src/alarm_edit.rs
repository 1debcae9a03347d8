use crate::{
    alarm::{Alarm, AlarmId, AlarmTime, RepeatRule},
    error::AlarmError,
    TimeOfDay,
};

/// everything needed to create a new alarm, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmBuilder {
    pub name: String,
    pub hour: u8,
    pub minute: u8,
    /// `None` means `hour` is on a 24 hour clock
    pub time_of_day: Option<TimeOfDay>,
    pub repeat: RepeatRule,
    pub sound: String,
    pub volume: u8,
}

impl Default for AlarmBuilder {
    fn default() -> Self {
        Self {
            name: String::default(),
            hour: 0,
            minute: 0,
            time_of_day: None,
            repeat: RepeatRule::default(),
            sound: String::default(),
            volume: Alarm::DEFAULT_VOLUME,
        }
    }
}

impl AlarmBuilder {
    #[must_use]
    pub fn at(time: AlarmTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn repeat(mut self, repeat: RepeatRule) -> Self {
        self.repeat = repeat;
        self
    }

    #[must_use]
    pub fn sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }

    #[must_use]
    pub fn volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    pub fn time(&self) -> Result<AlarmTime, AlarmError> {
        match self.time_of_day {
            Some(time_of_day) => AlarmTime::from_12h(self.hour, self.minute, time_of_day),
            None => AlarmTime::from_hm(self.hour, self.minute),
        }
    }

    /// an empty sound is left empty here, the clock fills in its default sound
    pub fn build(self, id: AlarmId) -> Result<Alarm, AlarmError> {
        let time = self.time()?;
        let name = self.name.trim();
        Ok(Alarm {
            id,
            name: if name.is_empty() {
                Alarm::DEFAULT_NAME.to_string()
            } else {
                name.to_string()
            },
            time,
            repeat: self.repeat,
            active: true,
            sound: self.sound,
            volume: self.volume.min(100),
        })
    }
}

/// a change to a single field of an existing alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEdit {
    Time(AlarmTime),
    Name(String),
    Repeat(RepeatRule),
    Sound(String),
    Volume(u8),
    Enable(bool),
}

impl AlarmEdit {
    /// returns true if the edit means a ringing alarm should stop
    pub fn apply(self, alarm: &mut Alarm) -> bool {
        match self {
            Self::Time(time) => {
                let moved = alarm.time != time;
                alarm.time = time;
                moved
            }
            Self::Name(name) => {
                let name = name.trim();
                alarm.name = if name.is_empty() {
                    Alarm::DEFAULT_NAME.to_string()
                } else {
                    name.to_string()
                };
                false
            }
            Self::Repeat(repeat) => {
                alarm.repeat = repeat;
                false
            }
            Self::Sound(sound) => {
                alarm.sound = sound;
                false
            }
            Self::Volume(volume) => {
                alarm.volume = volume.min(100);
                false
            }
            Self::Enable(enabled) => {
                alarm.active = enabled;
                !enabled
            }
        }
    }
}
