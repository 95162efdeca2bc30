use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use sotto_core::AudioError;

/// Name fragments that mark an input endpoint as a rendered-output monitor.
const MONITOR_MARKERS: [&str; 3] = ["monitor", "loopback", "stereo mix"];

pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn list_input_devices(&self) -> Result<Vec<(String, Device)>, AudioError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;

        let mut result = Vec::new();
        for device in devices {
            let name = device
                .name()
                .unwrap_or_else(|_| "unknown".to_string());
            result.push((name, device));
        }
        Ok(result)
    }

    pub fn get_input_device(&self, name: &str) -> Result<Device, AudioError> {
        if name == "default" {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()));
        }

        let devices = self.list_input_devices()?;
        for (dev_name, device) in devices {
            if dev_name == name {
                return Ok(device);
            }
        }
        Err(AudioError::DeviceNotFound(format!(
            "input device not found: {}",
            name
        )))
    }

    /// Resolve the system-output loopback endpoint. `auto-monitor` scans
    /// input names for a monitor/loopback marker; anything else is treated
    /// as an exact device name.
    pub fn get_loopback_device(&self, name: &str) -> Result<Device, AudioError> {
        if name != "auto-monitor" {
            return self.get_input_device(name);
        }

        let devices = self.list_input_devices()?;
        for (dev_name, device) in devices {
            if looks_like_monitor(&dev_name) {
                tracing::info!("using monitor device: {}", dev_name);
                return Ok(device);
            }
        }
        Err(AudioError::DeviceNotFound(
            "no monitor/loopback input device found".to_string(),
        ))
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

fn looks_like_monitor(name: &str) -> bool {
    let lowered = name.to_lowercase();
    MONITOR_MARKERS.iter().any(|m| lowered.contains(m))
}
