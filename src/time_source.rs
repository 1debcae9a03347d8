use chrono::NaiveDateTime;

/// where the tick loop gets the current wall clock time from
pub trait TimeSource {
    fn now(&self) -> NaiveDateTime;
}

/// the local time of the machine, alarms are compared in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl TimeSource for LocalTime {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
