//! Output device discovery.
//! Devices are picked by finding the one with the highest string similarity (dice coefficient) to the given name.

use cpal::{
    traits::{DeviceTrait, HostTrait},
    Device,
};
use tracing::debug;

use crate::{error::DeviceError, misc::Similarity};

/// Names of every output device on the default host.
pub fn list_output_devices() -> Result<Vec<String>, DeviceError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| DeviceError::NotFound(format!("Failed to enumerate devices: {e}")))?
        .filter_map(|x| x.name().ok())
        .collect::<Vec<_>>();

    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Finds an output device by name.
/// `default` picks the host's default output device.
pub fn find_output_device(name: &str) -> Result<Device, DeviceError> {
    let host = cpal::default_host();
    let wanted = name.to_lowercase();

    if wanted == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| DeviceError::NotFound("No default output device".to_owned()));
    }

    let comp_name = |dev: &Device| {
        dev.name()
            .map(|x| x.to_lowercase().similarity(&wanted))
            .unwrap_or(0.0)
    };

    host.output_devices()
        .map_err(|e| DeviceError::NotFound(e.to_string()))?
        .map(|x| (comp_name(&x), x))
        .reduce(|a, b| if a.0 >= b.0 { a } else { b })
        .map(|x| x.1)
        .ok_or_else(|| DeviceError::NotFound(name.to_owned()))
}
