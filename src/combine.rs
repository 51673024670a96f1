//! Interleave a scalar channel with a 3-channel gradient.

use crate::error::{BvpError, Result};
use crate::gradient::GRADIENT_CHANNELS;
use crate::volume::{VolumeBuffer, GRADIENT_COMPONENTS, SCALAR_COMPONENTS};

/// Pack `scalar[i]` and `gradient[3i..3i+3]` into `[s, gx, gy, gz]` per voxel.
///
/// Fails with [`BvpError::BufferSizeMismatch`] unless
/// `gradient.len() == 3 * scalar.len()`.
pub fn combine_volume_and_gradient(scalar: &[u8], gradient: &[u8]) -> Result<Vec<u8>> {
    let expected = scalar.len() * GRADIENT_CHANNELS;
    if gradient.len() != expected {
        return Err(BvpError::BufferSizeMismatch { expected, got: gradient.len() });
    }

    let mut packed = Vec::with_capacity(scalar.len() * GRADIENT_COMPONENTS);
    for (&s, g) in scalar.iter().zip(gradient.chunks_exact(GRADIENT_CHANNELS)) {
        packed.push(s);
        packed.extend_from_slice(g);
    }
    Ok(packed)
}

/// Combine a scalar [`VolumeBuffer`] with its gradient into a 4-component one.
pub fn attach_gradient(volume: VolumeBuffer, gradient: &[u8]) -> Result<VolumeBuffer> {
    if volume.components() != SCALAR_COMPONENTS {
        return Err(BvpError::BufferSizeMismatch {
            expected: volume.dimensions().voxel_count(),
            got:      volume.data().len(),
        });
    }
    let dims = volume.dimensions();
    let packed = combine_volume_and_gradient(volume.data(), gradient)?;
    VolumeBuffer::new(packed, dims, GRADIENT_COMPONENTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Dimensions;

    #[test]
    fn interleaves_channels() {
        let scalar = [10u8, 20];
        let gradient = [1u8, 2, 3, 4, 5, 6];
        let packed = combine_volume_and_gradient(&scalar, &gradient).unwrap();
        assert_eq!(packed, vec![10, 1, 2, 3, 20, 4, 5, 6]);
    }

    #[test]
    fn rejects_short_gradient() {
        let err = combine_volume_and_gradient(&[0u8; 10], &[0u8; 29]).unwrap_err();
        assert!(matches!(err, BvpError::BufferSizeMismatch { expected: 30, got: 29 }));
    }

    #[test]
    fn empty_inputs() {
        assert!(combine_volume_and_gradient(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn attach_produces_four_components() {
        let dims = Dimensions::new(2, 1, 1);
        let vol = VolumeBuffer::scalar(vec![7, 8], dims).unwrap();
        let packed = attach_gradient(vol, &[1, 1, 1, 2, 2, 2]).unwrap();
        assert_eq!(packed.components(), 4);
        assert_eq!(packed.data(), &[7, 1, 1, 1, 8, 2, 2, 2]);
    }
}
