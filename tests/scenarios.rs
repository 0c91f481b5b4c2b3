// Copyright (c) 2024 Mike Tsao. All rights reserved.

use pipiano::prelude::*;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pipiano::{display::DisplayEvent, settings::TrackSettings};
use std::{
    path::Path,
    time::{Duration, Instant},
};

fn write_wav(path: &Path, sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    // Whole frames only; hound refuses to finalize a partial one.
    for i in 0..2205 * channels as usize {
        writer.write_sample(((i % 40) * 500) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn sample_folder(count: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 1..=count {
        write_wav(&dir.path().join(format!("s{i}.wav")), 44100, 1);
    }
    dir
}

fn dispatcher() -> (RuntimeDispatcher, RecordingDisplay) {
    let display = RecordingDisplay::default();
    let dispatcher =
        RuntimeDispatcher::new_with(AudioDevice::new_null(), Box::new(display.clone())).unwrap();
    display.clear();
    (dispatcher, display)
}

fn deliver(events: Vec<InputEvent>, dispatcher: &mut RuntimeDispatcher) {
    for event in events {
        if let InputEvent::Controller(event) = event {
            dispatcher.handle(event).unwrap();
        }
    }
}

fn press(channel: Channel) -> ControllerEvent {
    ControllerEvent::Note {
        channel,
        pressed: true,
    }
}

fn release(channel: Channel) -> ControllerEvent {
    ControllerEvent::Note {
        channel,
        pressed: false,
    }
}

// A small sample folder: too few files for a full octave.
#[test]
fn default_then_small_sample_folder() {
    let folder = sample_folder(3);
    let mut display = RecordingDisplay::default();
    let mut registry = InstrumentRegistry::new_with(AudioDevice::new_null());
    registry.add(Box::<DefaultInstrument>::default(), &mut display);
    registry.add(
        Box::new(SamplePlayerInstrument::new_with(
            folder.path(),
            Default::default(),
        )),
        &mut display,
    );
    registry.select(0, &mut display).unwrap();

    registry.cycle(&mut display).unwrap();
    assert_eq!(registry.active_index(), Some(1));
    assert_eq!(registry.octave(), OctaveRange::new_with(0, 0));

    let active = registry.active_mut().unwrap();
    let status = active.instrument.note_on(active.device, 0, 0).unwrap();
    assert_eq!(status.text(), Some("s1.wav"));
    let status = active.instrument.note_on(active.device, 5, 0).unwrap();
    assert!(status.is_empty());
}

#[test]
fn sample_player_every_key_in_range() {
    let folder = sample_folder(14);
    let (mut dispatcher, display) = dispatcher();
    dispatcher.add_instrument(Box::new(SamplePlayerInstrument::new_with(
        folder.path(),
        Default::default(),
    )));
    dispatcher.select_instrument(1).unwrap();
    assert_eq!(dispatcher.registry().octave(), OctaveRange::new_with(0, 1));

    let name = dispatcher.registry().active_name().to_string();
    for octave in 0..=1 {
        if octave == 1 {
            dispatcher
                .handle(ControllerEvent::OctaveUp { pressed: true })
                .unwrap();
        }
        for channel in 0..=11 {
            display.clear();
            dispatcher.handle(press(channel)).unwrap();
            dispatcher.handle(release(channel)).unwrap();
            let slot = channel as usize + 12 * octave;
            let expected = if slot < 14 {
                format!("{name} s{}.wav", slot + 1)
            } else {
                format!("{name} ")
            };
            assert_eq!(display.last_status(), Some(expected));
        }
    }
}

#[test]
fn looping_track_reinitializes_once_per_octave_change() {
    let folder = tempfile::tempdir().unwrap();
    for name in ["a.wav", "b.wav"] {
        write_wav(&folder.path().join(name), 22050, 2);
    }
    let settings = TrackSettings {
        patterns: vec!["*.wav".to_string()],
        ..Default::default()
    };
    let (mut dispatcher, display) = dispatcher();
    dispatcher.add_instrument(Box::new(LoopingTrackInstrument::new_with(
        folder.path(),
        settings,
    )));
    dispatcher.select_instrument(1).unwrap();
    assert_eq!(dispatcher.registry().octave().current, 4);

    dispatcher.handle(press(0)).unwrap();
    let generation = dispatcher.registry().device().generation();
    let voices_at_four = dispatcher.registry().device().voice_ids();
    assert_eq!(voices_at_four.len(), 1);

    for _ in 0..2 {
        dispatcher
            .handle(ControllerEvent::OctaveUp { pressed: true })
            .unwrap();
    }
    assert_eq!(
        dispatcher.registry().device().generation(),
        generation,
        "octave keys alone don't touch the device"
    );
    dispatcher.handle(press(1)).unwrap();
    let device = dispatcher.registry().device();
    assert_eq!(device.generation(), generation + 1);
    assert_eq!(device.config().unwrap().sample_rate, 30877);
    assert!(device
        .voice_ids()
        .iter()
        .all(|id| !voices_at_four.contains(id)));
    assert!(display
        .last_status()
        .unwrap()
        .ends_with(" b.wav"));
}

#[test]
fn reselect_resets_the_octave() {
    let (mut dispatcher, _) = dispatcher();
    dispatcher.add_instrument(Box::new(DefaultInstrument::new_with("other", 10, 2)));
    dispatcher
        .handle(ControllerEvent::OctaveUp { pressed: true })
        .unwrap();
    dispatcher
        .handle(ControllerEvent::OctaveUp { pressed: true })
        .unwrap();
    assert_eq!(dispatcher.registry().octave().current, 7);

    dispatcher.select_instrument(1).unwrap();
    dispatcher.select_instrument(0).unwrap();
    assert_eq!(
        dispatcher.registry().octave().current,
        5,
        "reselecting starts over at the initial octave"
    );
}

#[test]
fn select_at_len_is_ignored() {
    let (mut dispatcher, display) = dispatcher();
    dispatcher.add_instrument(Box::new(DefaultInstrument::new_with("other", 10, 2)));
    display.clear();
    let len = dispatcher.registry().len();
    dispatcher.select_instrument(len).unwrap();
    assert_eq!(dispatcher.registry().active_index(), Some(0));
    assert!(display.events().is_empty());
}

#[test]
fn synth_top_key_only_toggles_sine() {
    let (mut dispatcher, display) = dispatcher();
    dispatcher.add_instrument(Box::<SynthInstrument>::default());
    dispatcher.select_instrument(1).unwrap();

    dispatcher.handle(press(12)).unwrap();
    dispatcher.handle(release(12)).unwrap();
    assert_eq!(dispatcher.registry().device().voice_count(), 0);

    dispatcher
        .handle(ControllerEvent::OctaveDown { pressed: true })
        .unwrap();
    dispatcher.handle(press(12)).unwrap();
    let toggles: Vec<(Waveform, bool)> = display
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DisplayEvent::Toggle(t) => Some((t.kind, t.enabled)),
            _ => None,
        })
        .collect();
    assert_eq!(
        toggles,
        vec![
            (Waveform::Sine, true),
            (Waveform::Sine, false),
            (Waveform::Square, true),
            (Waveform::Sine, true),
        ]
    );

    dispatcher.handle(press(0)).unwrap();
    assert_eq!(
        display.last_status(),
        Some("8BitSynth C sine square".to_string())
    );
    assert_eq!(dispatcher.registry().device().voice_count(), 2);
}

#[test]
fn relay_through_the_dispatcher() {
    let client = RecordingRelayClient::default();
    let (mut dispatcher, display) = dispatcher();
    dispatcher.add_instrument(Box::new(RelayInstrument::new_with(
        "yoshimi",
        Box::new(client.clone()),
        Default::default(),
    )));
    dispatcher
        .handle(ControllerEvent::InstrumentCycle { pressed: true })
        .unwrap();
    assert!(client.is_connected());

    dispatcher.handle(press(0)).unwrap();
    dispatcher.handle(release(0)).unwrap();
    let statuses = display.statuses();
    assert_eq!(
        statuses[statuses.len() - 2..],
        ["MIDI:yoshimi on 60", "MIDI:yoshimi off 60"]
    );
    assert_eq!(client.events().len(), 3, "program change, on, off");

    dispatcher
        .handle(ControllerEvent::InstrumentCycle { pressed: true })
        .unwrap();
    assert!(!client.is_connected());
}

// Without release reporting, a track must keep playing while its key's
// auto-repeat keeps arriving, and stop only once the repeats do.
#[test]
fn held_key_keeps_a_track_playing_without_release_reporting() {
    let folder = tempfile::tempdir().unwrap();
    write_wav(&folder.path().join("a.wav"), 22050, 2);
    let settings = TrackSettings {
        patterns: vec!["*.wav".to_string()],
        ..Default::default()
    };
    let (mut dispatcher, _) = dispatcher();
    dispatcher.add_instrument(Box::new(LoopingTrackInstrument::new_with(
        folder.path(),
        settings,
    )));
    dispatcher.select_instrument(1).unwrap();

    let keymap = KeyMap::default();
    let mut held = HeldKeys::new_with(keymap.hold());
    let z = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
    let start = Instant::now();
    let at = |ms: u64| start + Duration::from_millis(ms);

    deliver(held.key(&keymap, &z, at(0)), &mut dispatcher);
    assert_eq!(dispatcher.registry().device().voice_count(), 1);

    for ms in [500, 530, 560] {
        deliver(held.key(&keymap, &z, at(ms)), &mut dispatcher);
        deliver(held.expire(at(ms)), &mut dispatcher);
    }
    deliver(held.expire(at(1000)), &mut dispatcher);
    assert_eq!(
        dispatcher.registry().device().voice_count(),
        1,
        "still held while repeats arrive"
    );

    deliver(held.expire(at(1200)), &mut dispatcher);
    assert_eq!(dispatcher.registry().device().voice_count(), 0);
}
