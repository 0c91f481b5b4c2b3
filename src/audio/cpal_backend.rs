// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::{AudioBackend, DeviceConfig, SharedMixer};
use crate::{Error, Result};
use core::fmt::Debug;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, FromSample, Sample as CpalSample, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};

/// Wrapper for cpal structs that implements [core::fmt::Debug].
struct WrappedStream {
    #[allow(dead_code)]
    // reason = "We need to keep a reference to the stream or else it'll be dropped"
    cpal_stream: Stream,
    sample_rate: u32,
    channel_count: u16,
}
impl Debug for WrappedStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrappedStream")
            .field("cpal_stream", &"(skipped)")
            .field("sample_rate", &self.sample_rate)
            .field("channel_count", &self.channel_count)
            .finish()
    }
}
impl WrappedStream {
    fn new_with(config: &DeviceConfig, mixer: SharedMixer) -> Result<Self> {
        let (_host, device, supported) = Self::host_device_setup(config)?;
        let sample_rate = supported.sample_rate().0;
        let channel_count = supported.channels();
        if let Ok(mut mixer) = mixer.lock() {
            mixer.set_output_format(sample_rate, channel_count);
        }
        let cpal_stream = Self::stream_setup_for(&device, &supported, config.buffer_size, &mixer)?;
        cpal_stream
            .play()
            .map_err(|e| Error::Device(format!("couldn't start stream: {e}")))?;
        log::info!(
            "audio output at {sample_rate} Hz, {channel_count} channel(s); requested {} Hz",
            config.sample_rate
        );
        Ok(Self {
            cpal_stream,
            sample_rate,
            channel_count,
        })
    }

    /// Returns the default host, device, and the supported stream config
    /// closest to what was requested. A config with the exact rate and
    /// channel count wins; otherwise the device's default is used and the
    /// mixer converts.
    fn host_device_setup(
        config: &DeviceConfig,
    ) -> Result<(cpal::Host, cpal::Device, SupportedStreamConfig)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("Default output device is not available".to_string()))?;
        let default_config = device
            .default_output_config()
            .map_err(|e| Error::Device(e.to_string()))?;

        let wanted_rate = cpal::SampleRate(config.sample_rate);
        let exact = device.supported_output_configs().ok().and_then(|mut configs| {
            configs.find(|c| {
                c.channels() == config.channels
                    && c.min_sample_rate() <= wanted_rate
                    && wanted_rate <= c.max_sample_rate()
            })
        });
        let supported = match exact {
            Some(range) => range.with_sample_rate(wanted_rate),
            None => default_config,
        };
        Ok((host, device, supported))
    }

    /// Creates and returns a Stream for the given device and config. The Stream
    /// renders the supplied mixer. This function is actually a wrapper around
    /// the generic [WrappedStream::stream_make<T>()].
    fn stream_setup_for(
        device: &cpal::Device,
        config: &SupportedStreamConfig,
        period_size: u32,
        mixer: &SharedMixer,
    ) -> Result<Stream> {
        let config = config.clone();
        let sample_format = config.sample_format();
        let mut config: StreamConfig = config.into();

        // We set buffer size here, rather than in host_device_setup(), because
        // it's troublesome to create a [cpal::SupportedBufferSize] on the fly.
        config.buffer_size = BufferSize::Fixed(period_size);

        match sample_format {
            cpal::SampleFormat::I8 => Self::stream_make::<i8>(&config, device, mixer),
            cpal::SampleFormat::I16 => Self::stream_make::<i16>(&config, device, mixer),
            cpal::SampleFormat::I32 => Self::stream_make::<i32>(&config, device, mixer),
            cpal::SampleFormat::I64 => Self::stream_make::<i64>(&config, device, mixer),
            cpal::SampleFormat::U8 => Self::stream_make::<u8>(&config, device, mixer),
            cpal::SampleFormat::U16 => Self::stream_make::<u16>(&config, device, mixer),
            cpal::SampleFormat::U32 => Self::stream_make::<u32>(&config, device, mixer),
            cpal::SampleFormat::U64 => Self::stream_make::<u64>(&config, device, mixer),
            cpal::SampleFormat::F32 => Self::stream_make::<f32>(&config, device, mixer),
            cpal::SampleFormat::F64 => Self::stream_make::<f64>(&config, device, mixer),
            format => Err(Error::Device(format!(
                "unsupported sample format {format:?}"
            ))),
        }
    }

    /// Generic portion of stream_setup_for().
    fn stream_make<T>(
        config: &StreamConfig,
        device: &cpal::Device,
        mixer: &SharedMixer,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let err_fn = |err| log::error!("Error building output sound stream: {}", err);

        let mixer = SharedMixer::clone(mixer);
        let mut scratch: Vec<f32> = Vec::default();
        let stream = device
            .build_output_stream(
                config,
                move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                    Self::on_window(output, &mut scratch, &mixer)
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;
        Ok(stream)
    }

    /// cpal callback that renders the mixer, converting samples if needed to
    /// the stream's expected data type. If the control thread holds the mixer,
    /// this window is silent rather than blocking.
    fn on_window<T>(output: &mut [T], scratch: &mut Vec<f32>, mixer: &SharedMixer)
    where
        T: CpalSample + FromSample<f32>,
    {
        scratch.resize(output.len(), 0.0);
        match mixer.try_lock() {
            Ok(mut mixer) => mixer.render(scratch),
            Err(_) => scratch.fill(0.0),
        }
        for (out, sample) in output.iter_mut().zip(scratch.iter()) {
            *out = T::from_sample(*sample);
        }
    }
}

/// Plays the mixer through the system's default output device.
#[derive(Debug, Default)]
pub struct CpalBackend {
    stream: Option<WrappedStream>,
}
impl AudioBackend for CpalBackend {
    fn start(&mut self, config: &DeviceConfig, mixer: SharedMixer) -> Result<()> {
        self.stop();
        self.stream = Some(WrappedStream::new_with(config, mixer)?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.cpal_stream.pause() {
                log::debug!("while pausing stream: {e}");
            }
        }
    }
}
