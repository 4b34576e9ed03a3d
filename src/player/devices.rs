use cpal::traits::{DeviceTrait, HostTrait};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDevice {
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub is_default: bool,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Could not list output devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),
}

/// Output devices known to the default audio host.
///
/// Devices whose name or configuration cannot be read are skipped.
pub fn output_devices() -> Result<Vec<OutputDevice>, DeviceError> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.output_devices()? {
        let name = match device.name() {
            Ok(name) => name,
            Err(e) => {
                log::debug!(target: "devices", "skipping unnamed device: {e}");
                continue;
            }
        };

        let config = match device.default_output_config() {
            Ok(config) => config,
            Err(e) => {
                log::debug!(target: "devices", "skipping {name}: {e}");
                continue;
            }
        };

        log::debug!(
            target: "devices",
            "found {name} ({} ch @ {} Hz)",
            config.channels(),
            config.sample_rate().0
        );

        devices.push(OutputDevice {
            is_default: default_name.as_deref() == Some(name.as_str()),
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
            name,
        });
    }

    Ok(devices)
}
