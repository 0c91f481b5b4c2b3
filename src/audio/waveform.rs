// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Primitive single-cycle waveform generation.
//!
//! Each formula here describes exactly one period of its waveform. That's all
//! the synth needs, because it builds one period per note and loops it. The
//! result aliases audibly; that's the sound we want.

use super::{BitDepth, Clip};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum_macros::{Display, EnumCount, EnumIter, IntoStaticStr};

/// The waveform kinds the synth can layer. Iteration order is the order the
/// synth plays and reports them in.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumCount,
    EnumIter,
    Eq,
    Hash,
    IntoStaticStr,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase")]
pub enum Waveform {
    #[allow(missing_docs)]
    Sine,
    #[allow(missing_docs)]
    Saw,
    #[allow(missing_docs)]
    Square,
}

/// The largest positive amplitude for a signed sample of `bit_depth`.
pub fn max_amplitude(bit_depth: BitDepth) -> i32 {
    (1 << (bit_depth.bits() - 1)) - 1
}

/// Returns one signed sample of `waveform` at time `t` seconds.
///
/// `frequency * t` is treated as the phase within a single cycle, so the
/// square and saw formulas are only meaningful for `t` in the first period.
pub fn sample(waveform: Waveform, frequency: f64, t: f64, bit_depth: BitDepth) -> i32 {
    let max = max_amplitude(bit_depth);
    let phase = frequency * t;
    match waveform {
        Waveform::Sine => (max as f64 * (2.0 * PI * phase).sin()).round() as i32,
        Waveform::Square => {
            let m = (max as f64 * 0.9) as i32;
            if phase < 0.5 {
                -m
            } else {
                m
            }
        }
        Waveform::Saw => (max as f64 * (phase * 2.0 - 1.0)).round() as i32,
    }
}

/// Number of samples in one period of `frequency` at `sample_rate`.
pub fn period_length(frequency: f64, sample_rate: u32) -> usize {
    (sample_rate as f64 / frequency).round() as usize
}

/// Generates exactly one period of `waveform`, quantized to `bit_depth`.
pub fn single_cycle(
    waveform: Waveform,
    frequency: f64,
    sample_rate: u32,
    bit_depth: BitDepth,
) -> Vec<i32> {
    (0..period_length(frequency, sample_rate))
        .map(|i| sample(waveform, frequency, i as f64 / sample_rate as f64, bit_depth))
        .collect()
}

/// Builds a loopable [Clip] holding one period of `waveform`. With `stereo`,
/// each sample is written to both channels.
pub fn single_cycle_clip(
    waveform: Waveform,
    frequency: f64,
    sample_rate: u32,
    bit_depth: BitDepth,
    stereo: bool,
) -> Clip {
    let scale = (max_amplitude(bit_depth) + 1) as f32;
    let channels: u16 = if stereo { 2 } else { 1 };
    let samples = single_cycle(waveform, frequency, sample_rate, bit_depth)
        .into_iter()
        .flat_map(|s| std::iter::repeat(s as f32 / scale).take(channels as usize))
        .collect();
    Clip::new_with(
        &format!("{waveform} {frequency:.3}Hz"),
        sample_rate,
        channels,
        samples,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::{assert_ge, assert_le};
    use strum::IntoEnumIterator;

    #[test]
    fn amplitude_limits() {
        assert_eq!(max_amplitude(BitDepth::Eight), 127);
        assert_eq!(max_amplitude(BitDepth::Sixteen), 32767);
    }

    #[test]
    fn sine_formula() {
        assert_eq!(sample(Waveform::Sine, 1.0, 0.0, BitDepth::Eight), 0);
        assert_eq!(sample(Waveform::Sine, 1.0, 0.25, BitDepth::Eight), 127);
        assert_eq!(sample(Waveform::Sine, 1.0, 0.75, BitDepth::Eight), -127);
    }

    #[test]
    fn square_formula() {
        assert_eq!(sample(Waveform::Square, 1.0, 0.0, BitDepth::Eight), -114);
        assert_eq!(sample(Waveform::Square, 1.0, 0.49, BitDepth::Eight), -114);
        assert_eq!(sample(Waveform::Square, 1.0, 0.5, BitDepth::Eight), 114);
        assert_eq!(sample(Waveform::Square, 1.0, 0.99, BitDepth::Eight), 114);
    }

    #[test]
    fn saw_formula() {
        assert_eq!(sample(Waveform::Saw, 1.0, 0.0, BitDepth::Eight), -127);
        assert_eq!(sample(Waveform::Saw, 1.0, 0.5, BitDepth::Eight), 0);
        assert_eq!(sample(Waveform::Saw, 2.0, 0.25, BitDepth::Eight), 0);
    }

    #[test]
    fn one_period_per_buffer() {
        assert_eq!(period_length(440.0, 44100), 100);
        assert_eq!(period_length(261.626, 44100), 169);
        for waveform in Waveform::iter() {
            let cycle = single_cycle(waveform, 440.0, 44100, BitDepth::Eight);
            assert_eq!(cycle.len(), 100);
            for s in cycle {
                assert_ge!(s, -127);
                assert_le!(s, 127);
            }
        }
    }

    #[test]
    fn stereo_duplicates_samples() {
        let mono = single_cycle_clip(Waveform::Saw, 440.0, 44100, BitDepth::Eight, false);
        let stereo = single_cycle_clip(Waveform::Saw, 440.0, 44100, BitDepth::Eight, true);
        assert_eq!(mono.channels(), 1);
        assert_eq!(stereo.channels(), 2);
        assert_eq!(mono.frame_count(), stereo.frame_count());
        for (i, s) in mono.samples().iter().enumerate() {
            assert_eq!(stereo.samples()[i * 2], *s);
            assert_eq!(stereo.samples()[i * 2 + 1], *s);
        }
    }

    #[test]
    fn names_are_lowercase() {
        assert_eq!(Waveform::Sine.to_string(), "sine");
        let name: &'static str = Waveform::Square.into();
        assert_eq!(name, "square");
        assert_eq!(
            Waveform::iter().collect::<Vec<_>>(),
            vec![Waveform::Sine, Waveform::Saw, Waveform::Square]
        );
    }
}
