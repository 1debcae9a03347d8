use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use rodio::{Decoder, Sink, Source};

use crate::{
    alarm::{Alarm, AlarmId},
    communication::{Message, MessageType},
    config::{Config, Sound},
    error::PlaybackError,
};

/// the side effects of a ringing alarm
///
/// `play` may fail (no audio device, missing file). The clock treats that as
/// "visual only" and retries on the next tick, so implementations should not
/// block or panic.
pub trait Notifier {
    /// start the alarm's sound at the alarm's volume
    fn play(&mut self, alarm: &Alarm) -> Result<(), PlaybackError>;
    fn stop(&mut self);
    /// show that the alarm is ringing, independent of sound
    fn show(&mut self, alarm: &Alarm);
    fn hide(&mut self);
}

/// does nothing, for managing alarms without ringing them
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Notifier for Silent {
    fn play(&mut self, _alarm: &Alarm) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn show(&mut self, _alarm: &Alarm) {}

    fn hide(&mut self) {}
}

/// plays alarm sounds on a dedicated audio thread and prints alarms to the terminal
#[derive(Debug)]
pub struct SoundPlayer {
    sender: Sender<Message>,
    sounds: HashMap<String, Sound>,
    default_sound: String,
    time_format: String,
    playing: Option<AlarmId>,
}

impl SoundPlayer {
    #[must_use]
    pub fn new(
        sender: Sender<Message>,
        sounds: HashMap<String, Sound>,
        default_sound: String,
        time_format: String,
    ) -> Self {
        Self {
            sender,
            sounds,
            default_sound,
            time_format,
            playing: None,
        }
    }

    /// starts the audio thread, if it can't open an output device it exits and `play` reports it
    #[must_use]
    pub fn spawn(config: &Config) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || play_loop(&rx));
        Self::new(
            tx,
            config.sounds.clone(),
            config.default_sound.clone(),
            config.time_format.clone(),
        )
    }

    fn resolve(&self, name: &str) -> Result<&Sound, PlaybackError> {
        self.sounds
            .get(name)
            .or_else(|| {
                log::warn!("no sound named {name:?}, using {:?}", self.default_sound);
                self.sounds.get(&self.default_sound)
            })
            .ok_or_else(|| PlaybackError::UnknownSound(name.to_string()))
    }
}

impl Notifier for SoundPlayer {
    fn play(&mut self, alarm: &Alarm) -> Result<(), PlaybackError> {
        let sound = self.resolve(&alarm.sound)?;
        let file = File::open(&sound.path).map_err(|source| PlaybackError::Open {
            path: sound.path.clone(),
            source,
        })?;
        self.sender
            .send(Message::new(
                MessageType::AlarmTriggered {
                    volume: alarm.volume,
                    sound: BufReader::new(file),
                },
                alarm.id,
            ))
            .map_err(|_| PlaybackError::Disconnected)?;
        self.playing = Some(alarm.id);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(alarm_id) = self.playing.take() {
            if self
                .sender
                .send(Message::new(MessageType::AlarmStopped, alarm_id))
                .is_err()
            {
                log::warn!("audio thread is gone, couldn't stop alarm {alarm_id}");
            }
        }
    }

    fn show(&mut self, alarm: &Alarm) {
        println!(
            "\n*** {} ({}) ***\n[s]nooze  [d]ismiss",
            alarm.name,
            alarm.time.format(&self.time_format).trim()
        );
    }

    fn hide(&mut self) {
        println!("alarm stopped");
    }
}

fn play_loop(rx: &Receiver<Message>) {
    let stream_handle = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream_handle) => stream_handle,
        Err(e) => {
            log::error!("couldn't open audio output, alarms will be silent: {e}");
            return;
        }
    };
    let mut current: Option<(AlarmId, Sink)> = None;
    while let Ok(Message { kind, alarm_id }) = rx.recv() {
        match kind {
            MessageType::AlarmTriggered { volume, sound } => {
                // only one alarm rings at a time
                if let Some((_, sink)) = current.take() {
                    sink.stop();
                }
                // create source that repeatedly plays the sound at the specified volume and play it
                let input = match Decoder::new(sound) {
                    Ok(input) => input.repeat_infinite(),
                    Err(e) => {
                        log::error!("couldn't decode sound for alarm {alarm_id}: {e}");
                        continue;
                    }
                };
                let sink = Sink::connect_new(stream_handle.mixer());
                sink.set_volume(f32::from(volume) / 100.0);
                sink.append(input);
                sink.play();
                log::info!("alarm {alarm_id} playing with volume {volume}");
                current = Some((alarm_id, sink));
            }
            MessageType::AlarmStopped => {
                if let Some((playing, sink)) = current.take() {
                    if playing == alarm_id {
                        log::info!("alarm {alarm_id} stopped");
                        sink.stop();
                    } else {
                        current = Some((playing, sink));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::*;
    use crate::alarm_edit::AlarmBuilder;

    fn alarm(sound: &str) -> Alarm {
        AlarmBuilder::at("07:00".parse().unwrap())
            .sound(sound)
            .volume(40)
            .build(4)
            .unwrap()
    }

    fn player(sender: Sender<Message>, sounds: Vec<Sound>) -> SoundPlayer {
        SoundPlayer::new(
            sender,
            sounds
                .into_iter()
                .map(|sound| (sound.name.clone(), sound))
                .collect(),
            "bell".to_string(),
            "%H:%M".to_string(),
        )
    }

    #[test]
    fn play_sends_sound_to_audio_thread() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chime.mp3");
        std::fs::write(&path, b"not really an mp3").unwrap();
        let (tx, rx) = mpsc::channel();
        let mut player = player(tx, vec![Sound::new("chime".to_string(), path)]);

        player.play(&alarm("chime")).unwrap();
        let message = rx.try_recv().unwrap();
        assert_eq!(message.alarm_id, 4);
        assert!(matches!(
            message.kind,
            MessageType::AlarmTriggered { volume: 40, .. }
        ));

        player.stop();
        let message = rx.try_recv().unwrap();
        assert!(matches!(message.kind, MessageType::AlarmStopped));
        // nothing playing, nothing to stop
        player.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_sound_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bell.mp3");
        std::fs::write(&path, b"ding").unwrap();
        let (tx, rx) = mpsc::channel();
        let mut player = player(tx, vec![Sound::new("bell".to_string(), path)]);

        player.play(&alarm("kazoo")).unwrap();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn unknown_sound_without_default_fails() {
        let (tx, _rx) = mpsc::channel();
        let mut player = player(tx, vec![]);
        assert!(matches!(
            player.play(&alarm("kazoo")),
            Err(PlaybackError::UnknownSound(name)) if name == "kazoo"
        ));
    }

    #[test]
    fn missing_file_fails() {
        let (tx, _rx) = mpsc::channel();
        let mut player = player(
            tx,
            vec![Sound::new(
                "bell".to_string(),
                PathBuf::from("/definitely/not/here/bell.mp3"),
            )],
        );
        assert!(matches!(
            player.play(&alarm("bell")),
            Err(PlaybackError::Open { .. })
        ));
    }

    #[test]
    fn dead_audio_thread_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bell.mp3");
        std::fs::write(&path, b"ding").unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut player = player(tx, vec![Sound::new("bell".to_string(), path)]);
        assert!(matches!(
            player.play(&alarm("bell")),
            Err(PlaybackError::Disconnected)
        ));
    }
}
