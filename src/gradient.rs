//! Per-voxel gradient estimation for shading.
//!
//! Interior voxels are convolved with three 3×3×3 derivative kernels;
//! voxels on the outer shell get a zero vector.  Each component is
//! quantized to a byte so the result can be packed next to the scalar.
//!
//! Kernel sign convention: positive weights sit on the `-1` side of the
//! derivative axis, so a value increasing along +x yields a negative `dx`.

use crate::error::{BvpError, Result};
use crate::volume::{Dimensions, VolumeBuffer, VoxelIndex, SCALAR_COMPONENTS};

/// Bytes per voxel in a gradient buffer.
pub const GRADIENT_CHANNELS: usize = 3;

const KERNEL_LEN: usize = 27;
type Kernel = [i32; KERNEL_LEN];

// Kernels are laid out like a 3×3×3 grid: index = i + 3j + 9k.

const SOBEL_X: Kernel = [
    1, 0, -1,   2, 0, -2,   1, 0, -1,
    2, 0, -2,   4, 0, -4,   2, 0, -2,
    1, 0, -1,   2, 0, -2,   1, 0, -1,
];

const SOBEL_Y: Kernel = [
     1,  2,  1,   0, 0, 0,  -1, -2, -1,
     2,  4,  2,   0, 0, 0,  -2, -4, -2,
     1,  2,  1,   0, 0, 0,  -1, -2, -1,
];

const SOBEL_Z: Kernel = [
     1,  2,  1,   2,  4,  2,   1,  2,  1,
     0,  0,  0,   0,  0,  0,   0,  0,  0,
    -1, -2, -1,  -2, -4, -2,  -1, -2, -1,
];

// Historical z kernel: the final weight is -2 rather than -1.
const LEGACY_Z: Kernel = [
     1,  2,  1,   2,  4,  2,   1,  2,  1,
     0,  0,  0,   0,  0,  0,   0,  0,  0,
    -1, -2, -1,  -2, -4, -2,  -1, -2, -2,
];

/// Which kernel weights to convolve with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GradientKernel {
    /// Symmetric 3D Sobel operator.
    #[default]
    Sobel,
    /// Sobel with the asymmetric z kernel older archives were built with.
    /// Output matches those archives byte for byte.
    Legacy,
}

impl GradientKernel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sobel  => "sobel",
            Self::Legacy => "legacy",
        }
    }

    fn kernels(&self) -> [&'static Kernel; 3] {
        match self {
            Self::Sobel  => [&SOBEL_X, &SOBEL_Y, &SOBEL_Z],
            Self::Legacy => [&SOBEL_X, &SOBEL_Y, &LEGACY_Z],
        }
    }
}

// ── Per-voxel estimators ──────────────────────────────────────────────────────

/// Directional derivatives at an interior voxel, each roughly in `[-1, 1]`.
///
/// `idx` must have at least one neighbor on each side along every axis.
pub fn derivative_at(data: &[u8], dims: Dimensions, idx: VoxelIndex, kernel: GradientKernel) -> [f64; 3] {
    let mut values = [0u8; KERNEL_LEN];
    for k in 0..3u32 {
        for j in 0..3u32 {
            for i in 0..3u32 {
                let sample = VoxelIndex::new(idx.x + i - 1, idx.y + j - 1, idx.z + k - 1);
                values[(i + 3 * j + 9 * k) as usize] = data[sample.flat(dims)];
            }
        }
    }

    match kernel {
        // Integer accumulation keeps symmetric kernels exactly zero on flat data.
        GradientKernel::Sobel => kernel.kernels().map(|weights| {
            let sum: i32 = weights.iter().zip(&values).map(|(w, &v)| w * v as i32).sum();
            sum as f64 / 255.0 / KERNEL_LEN as f64
        }),
        // Normalized samples summed in kernel order, as historical archives were.
        GradientKernel::Legacy => kernel.kernels().map(|weights| {
            let sum = weights
                .iter()
                .zip(&values)
                .fold(0.0f64, |acc, (&w, &v)| acc + w as f64 * (v as f64 / 255.0));
            sum / KERNEL_LEN as f64
        }),
    }
}

/// Map a derivative in `[-1, 1]` onto a byte.
pub fn quantize(d: f64) -> u8 {
    ((d + 1.0) * 0.5 * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Forward-difference gradient magnitude at `idx`.
///
/// Returns `None` when `idx` has no +1 neighbor on some axis.
pub fn gradient_magnitude_forward(data: &[u8], dims: Dimensions, idx: VoxelIndex) -> Option<f64> {
    if idx.x + 1 >= dims.width || idx.y + 1 >= dims.height || idx.z + 1 >= dims.depth {
        return None;
    }
    let at = |v: VoxelIndex| data[v.flat(dims)] as f64 / 255.0;
    let center = at(idx);
    let dx = at(VoxelIndex::new(idx.x + 1, idx.y, idx.z)) - center;
    let dy = at(VoxelIndex::new(idx.x, idx.y + 1, idx.z)) - center;
    let dz = at(VoxelIndex::new(idx.x, idx.y, idx.z + 1)) - center;
    Some((dx * dx + dy * dy + dz * dz).sqrt())
}

// ── Whole-volume estimation ───────────────────────────────────────────────────

/// Compute a quantized 3-channel gradient for every voxel of a scalar volume.
///
/// The output has `3 * voxel_count` bytes laid out `[gx, gy, gz]` per voxel
/// in the same row-major order as the input.
pub fn compute_gradient(volume: &VolumeBuffer, kernel: GradientKernel) -> Result<Vec<u8>> {
    if volume.components() != SCALAR_COMPONENTS {
        return Err(BvpError::BufferSizeMismatch {
            expected: volume.dimensions().voxel_count(),
            got:      volume.data().len(),
        });
    }

    let dims = volume.dimensions();
    let data = volume.data();
    let mut out = vec![0u8; dims.voxel_count() * GRADIENT_CHANNELS];
    let slice_len = dims.width as usize * dims.height as usize * GRADIENT_CHANNELS;
    if slice_len == 0 {
        return Ok(out);
    }

    log::info!("computing {} gradient for {dims} volume", kernel.name());

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(slice_len)
            .enumerate()
            .for_each(|(z, slice)| fill_slice(data, dims, z as u32, kernel, slice));
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (z, slice) in out.chunks_mut(slice_len).enumerate() {
            fill_slice(data, dims, z as u32, kernel, slice);
        }
    }

    Ok(out)
}

fn fill_slice(data: &[u8], dims: Dimensions, z: u32, kernel: GradientKernel, slice: &mut [u8]) {
    for y in 0..dims.height {
        for x in 0..dims.width {
            let idx = VoxelIndex::new(x, y, z);
            if dims.is_boundary(idx) {
                // Zero-initialised already.
                continue;
            }
            let at = (x as usize + y as usize * dims.width as usize) * GRADIENT_CHANNELS;
            let d = derivative_at(data, dims, idx, kernel);
            for (dst, component) in slice[at..at + GRADIENT_CHANNELS].iter_mut().zip(d) {
                *dst = quantize(component);
            }
        }
    }
}
