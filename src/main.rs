use std::{error::Error, io, path::PathBuf, sync::mpsc::Sender, thread, time::Duration};

use clap::{Parser, Subcommand};
use study_alarm::{
    alarm::{AlarmId, AlarmTime, RepeatRule},
    alarm_edit::{AlarmBuilder, AlarmEdit},
    clock::Clock,
    config::{Config, Sound},
    notify::{Notifier, Silent, SoundPlayer},
    runner::{self, Input},
    store::{AlarmStore, ConfigStore},
    time_source::{LocalTime, TimeSource},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// make a sound file available to alarms under a name
    NewSound { name: String, path: PathBuf },
    NewAlarm {
        /// HH:MM or H:MM AM/PM
        time: AlarmTime,
        #[clap(long, short)]
        name: Option<String>,
        /// once, daily, weekdays or weekends
        #[clap(long, short, value_parser = parse_repeat, default_value = "once")]
        repeat: RepeatRule,
        #[clap(long, short)]
        sound: Option<String>,
        #[clap(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },
    List,
    /// switch an alarm on or off
    Toggle { id: AlarmId },
    Edit {
        id: AlarmId,
        #[clap(long, short)]
        time: Option<AlarmTime>,
        #[clap(long, short)]
        name: Option<String>,
        #[clap(long, short, value_parser = parse_repeat)]
        repeat: Option<RepeatRule>,
        #[clap(long, short)]
        sound: Option<String>,
        #[clap(long, short, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },
    Remove { id: AlarmId },
    /// keep running and ring alarms when they are due (the default)
    Run,
}

fn parse_repeat(text: &str) -> Result<RepeatRule, String> {
    RepeatRule::parse_known(text)
        .ok_or_else(|| format!("{text:?} is not one of once, daily, weekdays, weekends"))
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("study_alarm").expect("couldn't initialize logger");

    let args = Args::parse();
    let path = Config::config_path()?;
    match args.command {
        Some(Command::Init { force }) => {
            if force || !path.exists() {
                Config::new().save(&path)?;
                let sounds = Config::sounds_path();
                std::fs::create_dir_all(&sounds)?;
                println!("wrote {}", path.display());
                println!(
                    "put bell.mp3, chime.mp3, digital.mp3 and voice.mp3 in {}",
                    sounds.display()
                );
            } else {
                println!(
                    "{} already exists, use --force to overwrite it",
                    path.display()
                );
            }
        }
        Some(Command::NewSound { name, path: sound_path }) => {
            let mut config = Config::load_or_default(&path)?;
            config
                .sounds
                .insert(name.clone(), Sound::new(name.clone(), sound_path));
            config.save(&path)?;
            println!("added sound {name}");
        }
        Some(Command::NewAlarm {
            time,
            name,
            repeat,
            sound,
            volume,
        }) => {
            let config = Config::load_or_default(&path)?;
            let mut clock = Clock::new(ConfigStore::new(path), Silent, config.settings());
            let mut builder = AlarmBuilder::at(time)
                .name(name.unwrap_or_default())
                .repeat(repeat);
            if let Some(sound) = sound {
                if !config.sounds.contains_key(&sound) {
                    println!("warning: no sound named {sound:?}, the default will play instead");
                }
                builder = builder.sound(sound);
            }
            if let Some(volume) = volume {
                builder = builder.volume(volume);
            }
            let id = clock.create(builder)?;
            println!("created alarm {id}");
        }
        Some(Command::List) => {
            let config = Config::load_or_default(&path)?;
            let clock = Clock::new(ConfigStore::new(path), Silent, config.settings());
            print_alarms(&clock, &config.time_format, &LocalTime.now());
        }
        Some(Command::Toggle { id }) => {
            let config = Config::load_or_default(&path)?;
            let mut clock = Clock::new(ConfigStore::new(path), Silent, config.settings());
            match clock.toggle_active(id) {
                Some(true) => println!("alarm {id} is on"),
                Some(false) => println!("alarm {id} is off"),
                None => println!("no alarm with id {id}"),
            }
        }
        Some(Command::Edit {
            id,
            time,
            name,
            repeat,
            sound,
            volume,
        }) => {
            let config = Config::load_or_default(&path)?;
            let mut clock = Clock::new(ConfigStore::new(path), Silent, config.settings());
            let edits = [
                time.map(AlarmEdit::Time),
                name.map(AlarmEdit::Name),
                repeat.map(AlarmEdit::Repeat),
                sound.map(AlarmEdit::Sound),
                volume.map(AlarmEdit::Volume),
            ];
            if clock.alarm(id).is_none() {
                println!("no alarm with id {id}");
            } else {
                for edit in edits.into_iter().flatten() {
                    clock.edit(id, edit);
                }
                println!("updated alarm {id}");
            }
        }
        Some(Command::Remove { id }) => {
            let config = Config::load_or_default(&path)?;
            let mut clock = Clock::new(ConfigStore::new(path), Silent, config.settings());
            match clock.delete(id) {
                Some(alarm) => println!("removed alarm {id} ({})", alarm.name),
                None => println!("no alarm with id {id}"),
            }
        }
        Some(Command::Run) | None => run(path)?,
    }
    Ok(())
}

fn run(path: PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Config::load_or_default(&path)?;
    let player = SoundPlayer::spawn(&config);
    let mut clock = Clock::new(ConfigStore::new(path), player, config.settings());
    if config.start_muted {
        clock.lock_audio();
        println!("sound is off until you enter u");
    }
    print_alarms(&clock, &config.time_format, &LocalTime.now());
    println!("enter s to snooze, d to dismiss, u to enable sound, q to quit");

    let (tx, rx) = std::sync::mpsc::channel();
    // keeps the clock running when stdin is closed
    let keep_alive = tx.clone();
    thread::spawn(move || read_inputs(&tx));
    runner::run(&mut clock, &LocalTime, &rx, Duration::from_secs(1));
    drop(keep_alive);
    Ok(())
}

fn read_inputs(tx: &Sender<Input>) {
    for line in io::stdin().lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        match Input::parse(&line) {
            Some(input) => {
                if tx.send(input).is_err() {
                    break;
                }
            }
            None => println!("unknown command {line:?}, use s, d, u or q"),
        }
    }
}

fn print_alarms<S: AlarmStore, N: Notifier>(
    clock: &Clock<S, N>,
    time_format: &str,
    now: &chrono::NaiveDateTime,
) {
    if clock.alarms().is_empty() {
        println!("no alarms set");
        return;
    }
    for alarm in clock.alarms() {
        let next = alarm
            .next_occurrence(now)
            .map_or_else(|| "off".to_string(), |at| at.format("%a %e %b %H:%M").to_string());
        println!(
            "{:>3}  {:>8}  {:<16} {:<9} {:<8} {:>3}%  next: {next}",
            alarm.id,
            alarm.time.format(time_format),
            alarm.name,
            alarm.repeat.describe(),
            alarm.sound,
            alarm.volume,
        );
    }
    let summary = clock.summary();
    println!("{} alarms, {} active", summary.total, summary.active);
}
