//! Backend abstraction - compile-time backend selection
//!
//! NdArray (CPU) is the default; the `cuda` feature switches to burn-cuda.
//! The configured device string must match the compiled backend.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

use crate::config::DeviceKind;
use crate::utils::{Result, ShadowError};

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
pub type DefaultBackend = burn_ndarray::NdArray;

#[cfg(all(not(feature = "cuda"), not(feature = "ndarray")))]
compile_error!("At least one backend (cuda or ndarray) must be enabled!");

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device type of the compiled backend
pub type Device = <DefaultBackend as Backend>::Device;

/// Resolve a configured device against the compiled backend
pub fn device_for(kind: DeviceKind) -> Result<Device> {
    #[cfg(feature = "cuda")]
    {
        match kind {
            DeviceKind::Cuda(ordinal) => Ok(burn_cuda::CudaDevice::new(ordinal)),
            DeviceKind::Cpu => Err(ShadowError::Config(
                "device 'cpu' requested but this build uses the CUDA backend".to_string(),
            )),
        }
    }

    #[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
    {
        match kind {
            DeviceKind::Cpu => Ok(burn_ndarray::NdArrayDevice::Cpu),
            DeviceKind::Cuda(_) => Err(ShadowError::Config(
                "device 'cuda' requested but this build has no CUDA backend (enable the `cuda` feature)"
                    .to_string(),
            )),
        }
    }
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA (GPU)"
    }

    #[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
    {
        "NdArray (CPU)"
    }
}

#[cfg(all(test, not(feature = "cuda")))]
mod tests {
    use super::*;

    #[test]
    fn test_device_mismatch_is_config_error() {
        assert!(device_for(DeviceKind::Cpu).is_ok());
        assert!(matches!(
            device_for(DeviceKind::Cuda(0)),
            Err(ShadowError::Config(_))
        ));
        assert_eq!(backend_name(), "NdArray (CPU)");
    }
}
