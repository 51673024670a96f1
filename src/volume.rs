//! Dense voxel grids: extents, coordinates and owned voxel buffers.
//!
//! All grids are row-major with x varying fastest:
//! `flat = x + y * width + z * width * height`.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};

use crate::error::{BvpError, InputExtent, Result};

/// Bytes per voxel for a scalar-only volume.
pub const SCALAR_COMPONENTS: usize = 1;
/// Bytes per voxel for a scalar + gradient volume (`[s, gx, gy, gz]`).
pub const GRADIENT_COMPONENTS: usize = 4;

// ── Dimensions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width:  u32,
    pub height: u32,
    pub depth:  u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub const fn cube(edge: u32) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Total voxel count; fails if it does not fit in `usize`.
    pub fn checked_voxel_count(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.depth as usize))
            .ok_or_else(|| BvpError::InvalidDimensions(format!(
                "{}x{}x{} overflows the addressable voxel count",
                self.width, self.height, self.depth
            )))
    }

    pub fn voxel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }

    pub fn contains(&self, idx: VoxelIndex) -> bool {
        idx.x < self.width && idx.y < self.height && idx.z < self.depth
    }

    /// True when `idx` lies on the outermost layer along any axis.
    pub fn is_boundary(&self, idx: VoxelIndex) -> bool {
        idx.x == 0 || idx.y == 0 || idx.z == 0
            || idx.x + 1 == self.width
            || idx.y + 1 == self.height
            || idx.z + 1 == self.depth
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

// ── VoxelIndex ────────────────────────────────────────────────────────────────

/// A 0-based voxel coordinate.  Also serves as a block's voxel-space origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VoxelIndex {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl VoxelIndex {
    pub const ORIGIN: VoxelIndex = VoxelIndex { x: 0, y: 0, z: 0 };

    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn flat(&self, dims: Dimensions) -> usize {
        let w = dims.width as usize;
        let h = dims.height as usize;
        self.x as usize + self.y as usize * w + self.z as usize * w * h
    }

    pub fn offset_by(&self, other: VoxelIndex) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

// ── VolumeBuffer ──────────────────────────────────────────────────────────────

/// Owned voxel bytes; `data.len() == voxel_count * components` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBuffer {
    data:       Vec<u8>,
    dimensions: Dimensions,
    components: usize,
}

impl VolumeBuffer {
    pub fn new(data: Vec<u8>, dimensions: Dimensions, components: usize) -> Result<Self> {
        let expected = dimensions
            .checked_voxel_count()?
            .checked_mul(components)
            .ok_or_else(|| BvpError::InvalidDimensions(format!(
                "{dimensions} with {components} components overflows"
            )))?;
        if data.len() != expected {
            return Err(BvpError::BufferSizeMismatch { expected, got: data.len() });
        }
        Ok(Self { data, dimensions, components })
    }

    pub fn scalar(data: Vec<u8>, dimensions: Dimensions) -> Result<Self> {
        Self::new(data, dimensions, SCALAR_COMPONENTS)
    }

    pub fn filled(dimensions: Dimensions, value: u8) -> Self {
        Self {
            data: vec![value; dimensions.voxel_count()],
            dimensions,
            components: SCALAR_COMPONENTS,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The `components` bytes of one voxel.
    pub fn voxel(&self, idx: VoxelIndex) -> &[u8] {
        let start = idx.flat(self.dimensions) * self.components;
        &self.data[start..start + self.components]
    }
}

// ── Input ─────────────────────────────────────────────────────────────────────

/// Read exactly one 8-bit scalar volume from `reader`.
///
/// The whole stream is consumed; a short or overlong stream is an
/// [`BvpError::InputSizeMismatch`] and nothing is returned.
pub fn read_volume<R: Read>(mut reader: R, dimensions: Dimensions) -> Result<VolumeBuffer> {
    let expected = dimensions.checked_voxel_count()?;
    let mut data = vec![0u8; expected];

    let mut filled = 0;
    while filled < expected {
        match reader.read(&mut data[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled != expected {
        return Err(BvpError::InputSizeMismatch {
            expected,
            actual: InputExtent::Exactly(filled),
        });
    }

    let mut extra = [0u8; 1];
    loop {
        match reader.read(&mut extra) {
            Ok(0) => break,
            Ok(_) => {
                return Err(BvpError::InputSizeMismatch {
                    expected,
                    actual: InputExtent::MoreThanExpected,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("read {expected} bytes of volume data ({dimensions})");
    VolumeBuffer::scalar(data, dimensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_index_is_x_fastest() {
        let dims = Dimensions::new(4, 3, 2);
        assert_eq!(VoxelIndex::new(0, 0, 0).flat(dims), 0);
        assert_eq!(VoxelIndex::new(1, 0, 0).flat(dims), 1);
        assert_eq!(VoxelIndex::new(0, 1, 0).flat(dims), 4);
        assert_eq!(VoxelIndex::new(0, 0, 1).flat(dims), 12);
        assert_eq!(VoxelIndex::new(3, 2, 1).flat(dims), 23);
    }

    #[test]
    fn boundary_detection() {
        let dims = Dimensions::cube(3);
        assert!(dims.is_boundary(VoxelIndex::new(0, 1, 1)));
        assert!(dims.is_boundary(VoxelIndex::new(1, 2, 1)));
        assert!(!dims.is_boundary(VoxelIndex::new(1, 1, 1)));
        assert!(Dimensions::cube(1).is_boundary(VoxelIndex::ORIGIN));
    }

    #[test]
    fn buffer_length_is_checked() {
        let dims = Dimensions::new(2, 2, 2);
        assert!(VolumeBuffer::scalar(vec![0; 8], dims).is_ok());
        assert!(matches!(
            VolumeBuffer::new(vec![0; 8], dims, GRADIENT_COMPONENTS),
            Err(BvpError::BufferSizeMismatch { expected: 32, got: 8 })
        ));
    }

    #[test]
    fn read_exact_volume() {
        let dims = Dimensions::new(2, 2, 2);
        let input: Vec<u8> = (0..8).collect();
        let vol = read_volume(&input[..], dims).unwrap();
        assert_eq!(vol.data(), &input[..]);
        assert_eq!(vol.voxel(VoxelIndex::new(1, 1, 1)), &[7]);
    }

    #[test]
    fn read_short_input_fails() {
        let dims = Dimensions::new(2, 2, 2);
        let err = read_volume(&[0u8; 5][..], dims).unwrap_err();
        assert!(matches!(
            err,
            BvpError::InputSizeMismatch { expected: 8, actual: InputExtent::Exactly(5) }
        ));
    }

    #[test]
    fn read_excess_input_fails() {
        let dims = Dimensions::new(2, 2, 2);
        let err = read_volume(&[0u8; 9][..], dims).unwrap_err();
        assert!(matches!(
            err,
            BvpError::InputSizeMismatch { expected: 8, actual: InputExtent::MoreThanExpected }
        ));
    }

    #[test]
    fn read_empty_volume() {
        let vol = read_volume(&[0u8; 0][..], Dimensions::new(0, 4, 4)).unwrap();
        assert!(vol.data().is_empty());
    }
}
