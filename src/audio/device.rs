//! Audio endpoint enumeration and classification
//!
//! Splits the host's input endpoints into microphone-class devices and
//! monitor/loopback-class devices (system audio). Enumeration is always
//! fresh; device topology can change between queries, so nothing here
//! is cached.
//!
//! cpal does not expose a capability tag distinguishing monitors from
//! real microphones, so classification goes through a strategy trait: a
//! platform integration can plug in an exact classifier where the host
//! provides one, and the default falls back to name-pattern heuristics
//! (PipeWire/PulseAudio ".monitor" suffixes, macOS loopback drivers,
//! Windows "stereo mix").

use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

/// Role of an input endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// A real capture device (the local user's voice)
    Microphone,
    /// A monitor/loopback source (audio the system is playing back)
    Monitor,
}

/// One enumerated input endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Position in the host's input device enumeration. Only stable for
    /// as long as the topology doesn't change.
    pub index: usize,
    pub name: String,
    pub role: DeviceRole,
}

/// Classification strategy for input endpoints
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, name: &str) -> DeviceRole;
}

/// Name-pattern fallback classifier
///
/// Last-resort heuristics for hosts without capability tags. Patterns
/// cover PipeWire/PulseAudio monitor sources, common macOS virtual
/// loopback drivers, and the Windows WASAPI "stereo mix" endpoint.
#[derive(Debug, Default)]
pub struct NameHeuristicClassifier;

const MONITOR_PATTERNS: &[&str] = &[
    ".monitor",
    "monitor of",
    "loopback",
    "stereo mix",
    "blackhole",
    "soundflower",
    "virtual",
];

impl DeviceClassifier for NameHeuristicClassifier {
    fn classify(&self, name: &str) -> DeviceRole {
        let lower = name.to_lowercase();
        if MONITOR_PATTERNS.iter().any(|p| lower.contains(p)) {
            DeviceRole::Monitor
        } else {
            DeviceRole::Microphone
        }
    }
}

/// Enumerates and classifies host audio endpoints
pub struct DeviceCatalog {
    classifier: Box<dyn DeviceClassifier>,
}

impl Default for DeviceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self {
            classifier: Box::new(NameHeuristicClassifier),
        }
    }

    /// Use a platform-specific classifier instead of the name heuristic
    pub fn with_classifier(classifier: Box<dyn DeviceClassifier>) -> Self {
        Self { classifier }
    }

    /// Enumerate input endpoints, optionally filtered by role.
    /// Queried on demand; results are never cached.
    pub fn list(&self, role: Option<DeviceRole>) -> Result<Vec<AudioDevice>, AudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::Connection(e.to_string()))?;

        let mut out = Vec::new();
        for (index, device) in devices.enumerate() {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    tracing::debug!("Skipping unnameable device {}: {}", index, e);
                    continue;
                }
            };
            let device_role = self.classifier.classify(&name);
            if role.is_none() || role == Some(device_role) {
                out.push(AudioDevice {
                    index,
                    name,
                    role: device_role,
                });
            }
        }
        Ok(out)
    }

    /// Auto-detect default devices: first microphone-class endpoint and
    /// first monitor-class endpoint, either of which may be absent.
    pub fn default_devices(&self) -> (Option<usize>, Option<usize>) {
        let devices = match self.list(None) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Device enumeration failed: {}", e);
                return (None, None);
            }
        };

        let mic = devices
            .iter()
            .find(|d| d.role == DeviceRole::Microphone)
            .map(|d| d.index);
        let system = devices
            .iter()
            .find(|d| d.role == DeviceRole::Monitor)
            .map(|d| d.index);

        (mic, system)
    }
}

/// Fetch a cpal input device by enumeration index
pub fn device_by_index(index: usize) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    host.input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .nth(index)
        .ok_or_else(|| AudioError::DeviceUnavailable(format!("index {}", index)))
}
