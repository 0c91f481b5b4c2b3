// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Plays a thirteen-key controller through a set of switchable instruments.
//! Try `cargo run -- --no-audio` to see it respond without a sound card.

use clap::Parser;
use pipiano::{
    audio::{AudioDevice, CpalBackend},
    controller::{InputEvent, KeyMap, TerminalKeyboard},
    discovery::discover_instruments,
    display::ConsoleDisplay,
    instruments::SynthInstrument,
    midi::{list_ports, relay_instruments, MidiController},
    runtime::{run, RuntimeDispatcher},
    settings::Settings,
    util::ChannelPair,
};
use std::{io::Stdout, path::PathBuf};

/// The program's command-line arguments.
#[derive(Parser, Debug, Default)]
#[clap(author, about, long_about = None)]
struct Args {
    /// JSON settings file. Anything it leaves out keeps its default.
    #[clap(short, long, value_parser)]
    settings: Option<PathBuf>,

    /// Folder whose subfolders hold samples and tracks
    #[clap(long, value_parser, default_value = "sounds")]
    sounds: PathBuf,

    /// Don't open an audio device; instruments play silently
    #[clap(long, value_parser)]
    no_audio: bool,

    /// Don't look for MIDI relays or a MIDI controller
    #[clap(long, value_parser)]
    no_midi: bool,

    /// MIDI input port (or part of its name) to use as a controller
    #[clap(short, long, value_parser)]
    controller: Option<String>,

    /// List MIDI ports and exit
    #[clap(long, value_parser)]
    list_ports: bool,

    /// Print version and exit
    #[clap(short = 'v', long, value_parser)]
    version: bool,
}

fn print_ports() -> anyhow::Result<()> {
    let ports = list_ports()?;
    println!("MIDI inputs (controllers):");
    for name in ports.inputs {
        println!("  {name}");
    }
    println!("MIDI outputs (relays):");
    for name in ports.outputs {
        println!("  {name}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.version {
        eprintln!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.list_ports {
        return print_ports();
    }

    let mut settings = match args.settings.as_ref() {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if args.controller.is_some() {
        settings.controller.midi_port = args.controller.clone();
    }

    let device = if args.no_audio {
        AudioDevice::new_null()
    } else {
        AudioDevice::new_with(Box::<CpalBackend>::default())
    };
    let mut dispatcher =
        RuntimeDispatcher::new_with(device, Box::new(ConsoleDisplay::<Stdout>::default()))?;
    dispatcher.add_instrument(Box::new(SynthInstrument::new_with(
        settings.synth.clone(),
    )));
    for instrument in discover_instruments(&args.sounds, &settings) {
        dispatcher.add_instrument(instrument);
    }
    if !args.no_midi {
        for relay in relay_instruments(&settings.relay, dispatcher.display_mut()) {
            dispatcher.add_instrument(relay);
        }
    }

    let events = ChannelPair::<InputEvent>::default();
    let _controller = match settings.controller.midi_port.as_ref() {
        Some(port) if !args.no_midi => {
            match MidiController::start(port, &settings.controller, events.sender()) {
                Ok(controller) => Some(controller),
                Err(e) => {
                    log::warn!("{e}");
                    dispatcher.message(&format!("Keyboard only: {e}"));
                    None
                }
            }
        }
        _ => None,
    };
    let mut keyboard =
        TerminalKeyboard::start(KeyMap::new_with(&settings.controller), events.sender())?;

    dispatcher.welcome();
    let result = run(&mut dispatcher, &events.receiver);
    keyboard.stop()?;
    Ok(result?)
}
