//! Device context tag

use std::fmt;

/// Device a tensor's memory is associated with
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    /// The host CPU (there's only one)
    #[default]
    Cpu,
    /// A CUDA device, identified by its ordinal
    Cuda(usize),
}

impl Device {
    /// Unique identifier of the device within its kind
    pub fn id(&self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Cuda(ordinal) => *ordinal,
        }
    }

    /// Returns true for the host CPU
    #[inline]
    pub fn is_cpu(&self) -> bool {
        matches!(self, Self::Cpu)
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}
