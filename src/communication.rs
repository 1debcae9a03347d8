use std::{fs::File, io::BufReader};

use crate::alarm::AlarmId;

/// sent from the clock to the audio thread
#[derive(Debug)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: AlarmId,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: AlarmId) -> Self {
        Self { kind, alarm_id }
    }
}

#[derive(Debug)]
pub enum MessageType {
    AlarmTriggered {
        /// percent
        volume: u8,
        sound: BufReader<File>,
    },
    // if the alarm is dismissed/snoozed/disabled/removed
    AlarmStopped,
}
