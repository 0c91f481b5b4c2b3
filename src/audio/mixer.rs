// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{BitDepth, Clip, ClipId};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// How many times a voice repeats its clip after the first pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Looping {
    /// Play once, then this many more times.
    Times(u32),
    /// Repeat until faded or stopped.
    Forever,
}
impl Looping {
    /// Interprets a signed loop count: negative means forever, otherwise the
    /// number of extra repeats.
    pub fn from_count(loops: i32) -> Self {
        if loops < 0 {
            Self::Forever
        } else {
            Self::Times(loops as u32)
        }
    }
}

/// Describes how a clip should be played.
#[derive(Clone, Copy, Debug)]
pub struct Playback {
    /// Repeat behavior.
    pub looping: Looping,
    /// Ramp from silence to full gain over this long.
    pub fade_in: Duration,
    /// If true, the clip plays at its own sample rate. If false, its frames are
    /// consumed at the device's logical rate, so the device rate sets the pitch
    /// and speed.
    pub native_rate: bool,
}
impl Default for Playback {
    fn default() -> Self {
        Self {
            looping: Looping::Times(0),
            fade_in: Duration::ZERO,
            native_rate: true,
        }
    }
}
impl Playback {
    /// Plays once plus `loops` repeats (negative for forever).
    pub fn with_loops(loops: i32) -> Self {
        Self {
            looping: Looping::from_count(loops),
            ..Default::default()
        }
    }

    /// Loops forever after ramping in.
    pub fn sustained(fade_in: Duration) -> Self {
        Self {
            looping: Looping::Forever,
            fade_in,
            ..Default::default()
        }
    }

    /// Consumes frames at the device's logical rate.
    pub fn at_device_rate(mut self) -> Self {
        self.native_rate = false;
        self
    }
}

/// Identifies one playing instance of a clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(usize);
impl VoiceId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct Fade {
    frames: usize,
    elapsed: usize,
}
impl Fade {
    fn new(frames: usize) -> Self {
        Self { frames, elapsed: 0 }
    }

    fn progress(&self) -> f32 {
        if self.frames == 0 {
            1.0
        } else {
            (self.elapsed as f32 / self.frames as f32).min(1.0)
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.frames
    }

    fn tick(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
    }
}

#[derive(Debug)]
struct Voice {
    id: VoiceId,
    clip: Arc<Clip>,
    position: f64,
    step: f64,
    looping: Looping,
    fade_in: Option<Fade>,
    fade_out: Option<Fade>,
    is_finished: bool,
}
impl Voice {
    fn gain(&self) -> f32 {
        let fade_in = self.fade_in.as_ref().map_or(1.0, |f| f.progress());
        let fade_out = self.fade_out.as_ref().map_or(1.0, |f| 1.0 - f.progress());
        fade_in * fade_out * self.clip.volume()
    }

    fn may_wrap(&self) -> bool {
        match self.looping {
            Looping::Forever => true,
            Looping::Times(n) => n > 0,
        }
    }

    /// Linear interpolation between the two frames around the current
    /// position.
    fn sample(&self, channel: usize, out_channels: usize) -> f32 {
        let frame_count = self.clip.frame_count();
        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;
        let next = if index + 1 < frame_count {
            index + 1
        } else if self.may_wrap() {
            0
        } else {
            index
        };
        let a = self.clip.sample_for(index, channel, out_channels);
        let b = self.clip.sample_for(next, channel, out_channels);
        a + (b - a) * frac
    }

    fn advance(&mut self) {
        if let Some(fade) = self.fade_in.as_mut() {
            fade.tick();
            if fade.is_complete() {
                self.fade_in = None;
            }
        }
        if let Some(fade) = self.fade_out.as_mut() {
            fade.tick();
            if fade.is_complete() {
                self.is_finished = true;
                return;
            }
        }

        let frame_count = self.clip.frame_count() as f64;
        self.position += self.step;
        while self.position >= frame_count {
            match self.looping {
                Looping::Forever => {}
                Looping::Times(0) => {
                    self.is_finished = true;
                    return;
                }
                Looping::Times(n) => self.looping = Looping::Times(n - 1),
            }
            self.position -= frame_count;
        }
    }
}

/// Sums the playing voices into interleaved output frames.
///
/// The mixer is owned by the audio device and shared with the backend's
/// callback. Commands such as [Mixer::play] and [Mixer::fade_out_clip] take
/// effect on the next rendered frame.
#[derive(Debug)]
pub struct Mixer {
    logical_rate: u32,
    output_rate: u32,
    output_channels: u16,
    bit_depth: BitDepth,
    max_voices: usize,
    voices: Vec<Voice>,
}
impl Mixer {
    /// Creates a mixer whose output runs at `logical_rate` until a backend says
    /// otherwise with [Mixer::set_output_format].
    pub fn new_with(
        logical_rate: u32,
        channels: u16,
        bit_depth: BitDepth,
        max_voices: usize,
    ) -> Self {
        Self {
            logical_rate: logical_rate.max(1),
            output_rate: logical_rate.max(1),
            output_channels: channels.max(1),
            bit_depth,
            max_voices,
            voices: Vec::default(),
        }
    }

    /// Tells the mixer what the hardware actually runs at.
    pub fn set_output_format(&mut self, sample_rate: u32, channels: u16) {
        self.output_rate = sample_rate.max(1);
        self.output_channels = channels.max(1);
    }

    #[allow(missing_docs)]
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    #[allow(missing_docs)]
    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    fn frames_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.output_rate as f64).round() as usize
    }

    /// Starts a new voice. Returns None if the clip is empty or every voice is
    /// busy, in which case nothing plays.
    pub fn play(&mut self, clip: &Arc<Clip>, playback: Playback) -> Option<VoiceId> {
        if clip.frame_count() == 0 {
            return None;
        }
        if self.voices.len() >= self.max_voices {
            log::trace!("all {} voices busy; dropping {}", self.max_voices, clip.name());
            return None;
        }
        let source_rate = if playback.native_rate {
            clip.sample_rate()
        } else {
            self.logical_rate
        };
        let fade_in_frames = self.frames_for(playback.fade_in);
        let id = VoiceId::next();
        self.voices.push(Voice {
            id,
            clip: Arc::clone(clip),
            position: 0.0,
            step: source_rate as f64 / self.output_rate as f64,
            looping: playback.looping,
            fade_in: (fade_in_frames > 0).then(|| Fade::new(fade_in_frames)),
            fade_out: None,
            is_finished: false,
        });
        Some(id)
    }

    /// Ramps every voice playing `clip_id` down to silence over `duration`,
    /// then drops them.
    pub fn fade_out_clip(&mut self, clip_id: ClipId, duration: Duration) {
        let frames = self.frames_for(duration);
        if frames == 0 {
            self.stop_clip(clip_id);
            return;
        }
        for voice in self.voices.iter_mut().filter(|v| v.clip.id() == clip_id) {
            if voice.fade_out.is_none() {
                voice.fade_out = Some(Fade::new(frames));
            }
        }
    }

    /// Silences every voice playing `clip_id` immediately.
    pub fn stop_clip(&mut self, clip_id: ClipId) {
        self.voices.retain(|v| v.clip.id() != clip_id);
    }

    /// Silences everything immediately.
    pub fn stop_all(&mut self) {
        self.voices.clear();
    }

    #[allow(missing_docs)]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Whether any voice is playing `clip_id`.
    pub fn is_playing(&self, clip_id: ClipId) -> bool {
        self.voices.iter().any(|v| v.clip.id() == clip_id)
    }

    /// The ids of all live voices, oldest first.
    pub fn voice_ids(&self) -> Vec<VoiceId> {
        self.voices.iter().map(|v| v.id).collect()
    }

    /// Fills `output` with interleaved frames at the output format. A partial
    /// trailing frame is left silent.
    pub fn render(&mut self, output: &mut [f32]) {
        let channels = self.output_channels as usize;
        let scale = (1_i32 << (self.bit_depth.bits() - 1)) as f32;
        output.fill(0.0);
        for frame in output.chunks_exact_mut(channels) {
            for voice in self.voices.iter_mut().filter(|v| !v.is_finished) {
                let gain = voice.gain();
                for (channel, sample) in frame.iter_mut().enumerate() {
                    *sample += voice.sample(channel, channels) * gain;
                }
                voice.advance();
            }
            for sample in frame.iter_mut() {
                *sample = ((sample.clamp(-1.0, 1.0) * scale).round() / scale).clamp(-1.0, 1.0);
            }
        }
        self.voices.retain(|v| !v.is_finished);
    }
}
