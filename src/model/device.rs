//! Compute device selection.

use std::fmt;
use std::str::FromStr;

use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::SessionBuilder;

/// Where the feature extractor runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Device {
    /// Plain CPU execution.
    #[default]
    Cpu,
    /// A CUDA device, by ordinal.
    Cuda(u32),
}

impl Device {
    /// Configure ONNX Runtime execution providers for this device.
    ///
    /// CUDA sessions keep the CPU provider as a fallback for unsupported ops.
    #[allow(clippy::cast_possible_wrap)]
    pub(crate) fn configure(
        self,
        builder: SessionBuilder,
    ) -> std::result::Result<SessionBuilder, ort::Error> {
        match self {
            Self::Cpu => builder.with_execution_providers([CPUExecutionProvider::default().build()]),
            Self::Cuda(ordinal) => builder.with_execution_providers([
                CUDAExecutionProvider::default()
                    .with_device_id(ordinal as i32)
                    .build(),
                CPUExecutionProvider::default().build(),
            ]),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| format!("unknown device '{s}', expected cpu, cuda or cuda:N")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for device in [Device::Cpu, Device::Cuda(1)] {
            assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
        }
    }
}
