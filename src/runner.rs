use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

use crate::{clock::Clock, notify::Notifier, store::AlarmStore, time_source::TimeSource};

/// what the user can do while the clock is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Snooze,
    Dismiss,
    UnlockAudio,
    Quit,
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "s" | "snooze" => Some(Self::Snooze),
            "d" | "dismiss" | "stop" => Some(Self::Dismiss),
            "u" | "unlock" | "sound" => Some(Self::UnlockAudio),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// ticks `clock` every `period` and applies inputs as they come in
///
/// returns on [`Input::Quit`] or once every sender of `inputs` is gone
pub fn run<S, N, T>(clock: &mut Clock<S, N>, time: &T, inputs: &Receiver<Input>, period: Duration)
where
    S: AlarmStore,
    N: Notifier,
    T: TimeSource,
{
    let mut next_tick = Instant::now();
    loop {
        match inputs.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
            Ok(Input::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(input) => apply(clock, input),
            Err(RecvTimeoutError::Timeout) => {
                for event in clock.tick(time.now()) {
                    log::debug!("tick: {event}");
                }
                // don't try to catch up on ticks missed while suspended
                next_tick = (next_tick + period).max(Instant::now());
            }
        }
    }
    log::info!("clock stopped");
}

fn apply<S: AlarmStore, N: Notifier>(clock: &mut Clock<S, N>, input: Input) {
    match input {
        Input::Snooze => {
            if !clock.snooze_ringing() {
                println!("no alarm is ringing");
            }
        }
        Input::Dismiss => {
            if !clock.dismiss_ringing() {
                println!("no alarm is ringing");
            }
        }
        Input::UnlockAudio => {
            clock.unlock_audio();
            println!("sound enabled");
        }
        Input::Quit => {}
    }
}
