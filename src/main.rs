use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tilt_tone::{
    audio::{devices, note, output::CpalOutput, parse_sequence, OutputDevice, PlayableItem},
    feedback::{
        orientation::SimulatedOrientation, CompositeLevelListener, FeedbackConfig,
        LevelListener, ToneFeedback, ZeroOffset,
    },
    player::{BackgroundPlayer, PlayerConfig},
};

mod args;
mod display;

/// Extra time allowed past the queued audio before giving up on the player going idle.
const IDLE_SLACK: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let args = args::parse_args();
    init_logging(args.get_flag("verbose"));

    match args.subcommand() {
        Some(("devices", _)) => list_devices(),
        Some(("play", m)) => play(&args, m),
        Some(("notes", m)) => notes(&args, m),
        Some(("tilt", m)) => tilt(&args, m),
        _ => anyhow::bail!("Invalid subcommand"),
    }
}

fn init_logging(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("info,tilt_tone=debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn list_devices() -> Result<()> {
    println!("[*] Output devices:");
    for i in devices::list_output_devices()? {
        println!(" - {i}");
    }

    Ok(())
}

/// Opens the requested output device and starts a player on it.
fn start_player(args: &ArgMatches) -> Result<BackgroundPlayer> {
    let name = args
        .get_one::<String>("device")
        .map(String::as_str)
        .unwrap_or("default");
    let output = CpalOutput::new(devices::find_output_device(name)?)
        .context("Failed to open output device")?;

    println!(
        "[*] Output hooked into `{}` ({} channels, {}Hz)",
        output.name(),
        output.channels(),
        output.sample_rate()
    );

    let config = PlayerConfig::default().sample_rate(output.sample_rate());
    let player = BackgroundPlayer::new(Box::new(output), config)?;
    player.start()?;
    Ok(player)
}

/// Waits for everything queued to play out, then stops the worker.
fn finish(player: BackgroundPlayer, queued: Duration) -> Result<()> {
    let drained = player.wait_idle(queued + IDLE_SLACK);
    player.stop();
    player.join();

    anyhow::ensure!(drained, "Player did not finish within {:?}", queued + IDLE_SLACK);
    println!("[*] Done");
    Ok(())
}

fn play(args: &ArgMatches, m: &ArgMatches) -> Result<()> {
    let seq = m
        .get_one::<String>("sequence")
        .context("No sequence given")?
        .replace(',', "\n");
    let items = parse_sequence(&seq)?;
    anyhow::ensure!(!items.is_empty(), "Sequence is empty");

    let total = items.iter().map(PlayableItem::duration).sum::<Duration>();
    println!("[I] {} items, {total:?}", items.len());

    let player = start_player(args)?;
    for i in items {
        player.queue(i);
    }

    finish(player, total)
}

fn notes(args: &ArgMatches, m: &ArgMatches) -> Result<()> {
    let duration = *m.get_one::<u32>("duration").context("No duration")?;
    let octave = *m.get_one::<i32>("octave").context("No octave")?;

    let player = start_player(args)?;
    let mut total = Duration::ZERO;
    for tone in note::c_major(duration) {
        let tone = match octave {
            0 => tone,
            o if o > 0 => tone.higher_octaves(o.unsigned_abs()),
            o => tone.lower_octaves(o.unsigned_abs()),
        };

        println!("[*] {:.2}Hz", tone.frequency());
        let item = PlayableItem::tone(tone);
        total += item.duration();
        player.queue(item);
    }

    finish(player, total)
}

fn tilt(args: &ArgMatches, m: &ArgMatches) -> Result<()> {
    let seconds = *m.get_one::<u64>("seconds").context("No duration")?;
    let interval = *m.get_one::<u64>("interval").context("No interval")?;
    let tolerance = *m.get_one::<f32>("tolerance").context("No tolerance")?;
    let seed = m.get_one::<u64>("seed").copied();
    let zero_first = m.get_flag("zero");

    let player = start_player(args)?;
    let config = FeedbackConfig {
        tolerance,
        ..FeedbackConfig::default()
    };

    let mut listeners = CompositeLevelListener::new()
        .with(display::LevelDisplay::new(tolerance, 30))
        .with(ToneFeedback::new(player.handle(), config));

    let mut zero = ZeroOffset::default();
    let mut first = zero_first;
    let mut calibrated = |pitch: f32, roll: f32| {
        if first {
            zero.apply(pitch, roll);
            zero.zero();
            first = false;
        }

        let (pitch, roll) = zero.apply(pitch, roll);
        listeners.on_level_changed(pitch, roll);
    };

    let mut source = SimulatedOrientation::spawn(Duration::from_millis(interval), seed)?;
    let count = source.drive(&mut calibrated, Duration::from_secs(seconds));
    source.stop();

    println!();
    println!("[I] {count} readings");
    finish(player, Duration::from_secs(2))
}
