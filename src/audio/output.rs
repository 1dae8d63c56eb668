//! cpal backed output device.
//!
//! Each track builds its own output stream when it starts playing.
//! The mono buffer is copied to every channel the device stream has,
//! and a frame cursor shared with the callback reports the playback position.
//!
//! The stream runs at [`SAMPLE_RATE`] when the device offers it for f32 output,
//! otherwise at the device's default rate. Players must synthesize at [`CpalOutput::sample_rate`].

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use cpal::{
    traits::{DeviceTrait, StreamTrait},
    BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use tracing::{debug, error, warn};

use super::session::{AudioTrack, BoxedTrack, OutputDevice, StreamFormat};
use crate::{constants::SAMPLE_RATE, error::DeviceError};

pub struct CpalOutput {
    device: Device,
    name: String,
    channels: u16,
    sample_rate: u32,
}

impl CpalOutput {
    pub fn new(device: Device) -> Result<Self, DeviceError> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_owned());
        let default = device
            .default_output_config()
            .map_err(|e| DeviceError::Config(e.to_string()))?;
        let ranges = match device.supported_output_configs() {
            Ok(x) => x.collect::<Vec<_>>(),
            Err(e) => {
                debug!("Failed to list output configs: {e}");
                Vec::new()
            }
        };

        let config = choose_config(ranges, default, SAMPLE_RATE);
        if config.sample_rate().0 != SAMPLE_RATE {
            warn!(
                device = %name,
                rate = config.sample_rate().0,
                "Device can't play {SAMPLE_RATE}Hz, using its default rate"
            );
        }

        Ok(Self {
            device,
            name,
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
        })
    }

    /// Rate tracks on this device are played at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output on the default device of the default host.
    pub fn default_device() -> Result<Self, DeviceError> {
        Self::new(super::devices::find_output_device("default")?)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl OutputDevice for CpalOutput {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open(&mut self, format: StreamFormat, frames: usize) -> Result<BoxedTrack, DeviceError> {
        if format.sample_rate != self.sample_rate {
            return Err(DeviceError::Config(format!(
                "`{}` plays at {}Hz, not {}Hz",
                self.name, self.sample_rate, format.sample_rate
            )));
        }

        debug!(device = %self.name, frames, "Opening track");
        Ok(Box::new(CpalTrack {
            device: self.device.clone(),
            config: StreamConfig {
                channels: self.channels,
                sample_rate: SampleRate(format.sample_rate),
                buffer_size: BufferSize::Default,
            },
            samples: Arc::from(Vec::<i16>::new()),
            capacity: frames,
            cursor: Arc::new(AtomicUsize::new(0)),
            stream: None,
        }))
    }
}

/// Picks the config tracks are built with.
/// Any f32 range covering `wanted` is used at that rate, otherwise the device default is kept.
fn choose_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    default: SupportedStreamConfig,
    wanted: u32,
) -> SupportedStreamConfig {
    let fits = ranges
        .into_iter()
        .filter(|x| {
            x.sample_format() == SampleFormat::F32
                && (x.min_sample_rate().0..=x.max_sample_rate().0).contains(&wanted)
        })
        .collect::<Vec<_>>();

    // Keep the default channel layout when a matching range has it
    fits.iter()
        .find(|x| x.channels() == default.channels())
        .or_else(|| fits.first())
        .map(|x| x.clone().with_sample_rate(SampleRate(wanted)))
        .unwrap_or(default)
}

struct CpalTrack {
    device: Device,
    config: StreamConfig,
    samples: Arc<[i16]>,
    capacity: usize,
    cursor: Arc<AtomicUsize>,
    stream: Option<Stream>,
}

impl AudioTrack for CpalTrack {
    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        let n = samples.len().min(self.capacity);
        self.samples = Arc::from(&samples[..n]);
        self.cursor.store(0, Ordering::SeqCst);
        Ok(n)
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        let samples = self.samples.clone();
        let cursor = self.cursor.clone();
        let channels = self.config.channels.max(1) as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let mut last = 0.0;
                    for (i, e) in data.iter_mut().enumerate() {
                        if i % channels == 0 {
                            let pos = cursor.load(Ordering::Relaxed);
                            last = match samples.get(pos) {
                                Some(&sample) => {
                                    cursor.store(pos + 1, Ordering::Relaxed);
                                    sample as f32 / 32768.0
                                }
                                None => 0.0,
                            };
                        }

                        *e = last;
                    }
                },
                move |err| error!("Output stream error: {err}"),
                None,
            )
            .map_err(|e| DeviceError::Build(e.to_string()))?;

        stream.play().map_err(|e| DeviceError::Play(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn playback_position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                debug!("Failed to pause stream: {e}");
            }
        }
    }

    fn release(&mut self) {
        // Dropping the stream closes it
        self.stream = None;
    }
}

#[cfg(test)]
mod test {
    use cpal::{
        SampleFormat, SampleRate, SupportedBufferSize, SupportedStreamConfig,
        SupportedStreamConfigRange,
    };

    use super::choose_config;

    fn range(
        channels: u16,
        min: u32,
        max: u32,
        format: SampleFormat,
    ) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    fn default_config(channels: u16, rate: u32) -> SupportedStreamConfig {
        SupportedStreamConfig::new(
            channels,
            SampleRate(rate),
            SupportedBufferSize::Unknown,
            SampleFormat::F32,
        )
    }

    #[test]
    fn test_uses_wanted_rate_when_supported() {
        let ranges = [
            range(1, 8000, 192000, SampleFormat::F32),
            range(2, 8000, 192000, SampleFormat::F32),
        ];
        let config = choose_config(ranges, default_config(2, 48000), 44100);
        assert_eq!(config.sample_rate(), SampleRate(44100));
        assert_eq!(config.channels(), 2);
    }

    #[test]
    fn test_falls_back_to_default_rate() {
        // A shared-mode device that only mixes at 48kHz
        let ranges = [
            range(2, 48000, 48000, SampleFormat::F32),
            range(2, 44100, 44100, SampleFormat::I16),
        ];
        let config = choose_config(ranges, default_config(2, 48000), 44100);
        assert_eq!(config.sample_rate(), SampleRate(48000));
        assert_eq!(config.channels(), 2);

        let config = choose_config([], default_config(6, 96000), 44100);
        assert_eq!(config.sample_rate(), SampleRate(96000));
        assert_eq!(config.channels(), 6);
    }

    #[test]
    fn test_other_layout_when_default_lacks_rate() {
        let ranges = [
            range(2, 48000, 48000, SampleFormat::F32),
            range(1, 44100, 44100, SampleFormat::F32),
        ];
        let config = choose_config(ranges, default_config(2, 48000), 44100);
        assert_eq!(config.sample_rate(), SampleRate(44100));
        assert_eq!(config.channels(), 1);
    }
}
