use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::{
    config::StreamSpec,
    error::{NetworkError, Result},
    graph::Renderer,
    io::backend::AudioBackend,
};

/// Output backend on the host's default device.
///
/// The device's own sample rate and channel count win over the configured
/// ones; the network re-prepares its items for whatever is negotiated.
#[derive(Default)]
pub struct CpalBackend {
    device: Option<cpal::Device>,
    config: Option<cpal::StreamConfig>,
    stream: Option<cpal::Stream>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_name(&self) -> Option<String> {
        self.device.as_ref().and_then(|d| d.name().ok())
    }
}

fn backend_err(err: impl std::fmt::Display) -> NetworkError {
    NetworkError::Backend(err.to_string())
}

impl AudioBackend for CpalBackend {
    fn negotiate(&mut self, desired: StreamSpec) -> Result<StreamSpec> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| backend_err("no default output device available"))?;
        let config: cpal::StreamConfig = device
            .default_output_config()
            .map_err(backend_err)?
            .into();

        let spec = StreamSpec {
            sample_rate: config.sample_rate.0 as f32,
            // Output-only stream
            input_channels: 0,
            output_channels: config.channels as usize,
            max_frames: desired.max_frames,
        };

        self.device = Some(device);
        self.config = Some(config);
        Ok(spec)
    }

    fn launch(&mut self, mut renderer: Renderer) -> Result<()> {
        let (Some(device), Some(config)) = (self.device.as_ref(), self.config.as_ref()) else {
            return Err(backend_err("launch called before negotiate"));
        };
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.process_interleaved(data, channels);
                },
                |err| error!(error = %err, "audio stream error"),
                None,
            )
            .map_err(backend_err)?;
        stream.play().map_err(backend_err)?;

        info!(
            device = self.device_name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels,
            "output stream running"
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn halt(&mut self) {
        // Dropping the stream stops the callback and drops the renderer
        self.stream = None;
    }
}
