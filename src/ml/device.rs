// ============================================================
// Layer 5 — Compute Device Selection
// ============================================================
// GPU (Wgpu) iff:
//   - the binary was built with the `gpu` feature
//   - a GPU is visible on this machine
//   - --no-cuda was not passed
// Otherwise the CPU NdArray backend is used.
//
// Reference: Burn Book §2 (Backends)

use std::{fmt, path::Path};

/// Device nodes whose presence means a GPU driver is loaded.
const GPU_PROBES: [&str; 3] = [
    "/proc/driver/nvidia/version",
    "/dev/nvidia0",
    "/dev/dri/renderD128",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Gpu,
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

pub fn select_device(no_cuda: bool, gpu_available: bool) -> ComputeDevice {
    if gpu_available && !no_cuda {
        ComputeDevice::Gpu
    } else {
        ComputeDevice::Cpu
    }
}

/// True if this build can drive a GPU and one is present.
pub fn gpu_available() -> bool {
    cfg!(feature = "gpu") && GPU_PROBES.iter().any(|probe| Path::new(probe).exists())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_used_iff_available_and_not_disabled() {
        for available in [false, true] {
            for no_cuda in [false, true] {
                let expected = if available && !no_cuda { ComputeDevice::Gpu } else { ComputeDevice::Cpu };
                assert_eq!(select_device(no_cuda, available), expected);
            }
        }
    }

    #[test]
    fn test_no_gpu_without_feature() {
        if !cfg!(feature = "gpu") {
            assert!(!gpu_available());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ComputeDevice::Cpu.to_string(), "cpu");
        assert_eq!(ComputeDevice::Gpu.to_string(), "gpu");
    }
}
