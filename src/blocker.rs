//! Partition a dense volume into fixed-size bricks.
//!
//! Bricks tile the volume with no gaps or overlaps.  Brick `(i, j, k)`
//! starts at `(i*B, j*B, k*B)` and is truncated at the far edge of each
//! axis.  Bricks are numbered row-major at brick granularity and are always
//! produced in ascending index order.

use crate::error::{BvpError, Result};
use crate::volume::{Dimensions, VolumeBuffer, VoxelIndex};

/// Default nominal brick edge length.
pub const DEFAULT_BLOCK_SIZE: u32 = 128;

// ── Layout ────────────────────────────────────────────────────────────────────

/// Placement of one brick within its volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub index:      usize,
    pub offset:     VoxelIndex,
    pub dimensions: Dimensions,
    pub components: usize,
}

impl BlockDescriptor {
    pub fn byte_len(&self) -> usize {
        self.dimensions.voxel_count() * self.components
    }
}

/// An extracted brick: its placement plus a contiguous copy of its voxels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub descriptor: BlockDescriptor,
    pub data:       Vec<u8>,
}

/// The brick lattice for a volume of given extent and nominal edge length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    volume:     Dimensions,
    block_size: u32,
    counts:     Dimensions,
}

impl BlockGrid {
    pub fn new(volume: Dimensions, block_size: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(BvpError::InvalidDimensions("block size must be at least 1".into()));
        }
        let counts = Dimensions::new(
            volume.width.div_ceil(block_size),
            volume.height.div_ceil(block_size),
            volume.depth.div_ceil(block_size),
        );
        Ok(Self { volume, block_size, counts })
    }

    pub fn volume(&self) -> Dimensions {
        self.volume
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Bricks per axis.
    pub fn counts(&self) -> Dimensions {
        self.counts
    }

    pub fn block_count(&self) -> usize {
        self.counts.voxel_count()
    }

    /// Descriptor of the brick at lattice position `cell`.
    pub fn descriptor(&self, cell: VoxelIndex, components: usize) -> BlockDescriptor {
        let b = self.block_size;
        let offset = VoxelIndex::new(cell.x * b, cell.y * b, cell.z * b);
        let dimensions = Dimensions::new(
            b.min(self.volume.width - offset.x),
            b.min(self.volume.height - offset.y),
            b.min(self.volume.depth - offset.z),
        );
        BlockDescriptor { index: cell.flat(self.counts), offset, dimensions, components }
    }

    /// All descriptors, k outermost and i innermost, i.e. ascending index.
    pub fn descriptors(&self, components: usize) -> impl Iterator<Item = BlockDescriptor> + '_ {
        let c = self.counts;
        (0..c.depth).flat_map(move |k| {
            (0..c.height).flat_map(move |j| {
                (0..c.width).map(move |i| self.descriptor(VoxelIndex::new(i, j, k), components))
            })
        })
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Copy the voxels covered by `desc` out of `volume` into a new buffer.
pub fn extract_block(volume: &VolumeBuffer, desc: &BlockDescriptor) -> Vec<u8> {
    let vdims = volume.dimensions();
    let c = volume.components();
    let row = desc.dimensions.width as usize * c;
    let mut out = Vec::with_capacity(desc.dimensions.voxel_count() * c);
    if row == 0 {
        return out;
    }
    let src = volume.data();
    for k in 0..desc.dimensions.depth {
        for j in 0..desc.dimensions.height {
            let start = desc.offset.offset_by(VoxelIndex::new(0, j, k)).flat(vdims) * c;
            out.extend_from_slice(&src[start..start + row]);
        }
    }
    out
}

/// Split `volume` into bricks of edge `block_size`, in ascending index order.
pub fn partition(volume: &VolumeBuffer, block_size: u32) -> Result<Vec<Block>> {
    let grid = BlockGrid::new(volume.dimensions(), block_size)?;
    let total = grid.block_count();
    let descriptors: Vec<BlockDescriptor> = grid.descriptors(volume.components()).collect();

    log::info!(
        "partitioning {} volume into {total} block(s) of edge {block_size}",
        volume.dimensions()
    );

    let extract = |desc: &BlockDescriptor| {
        log::debug!("extracting block {} of {total}", desc.index);
        Block { descriptor: *desc, data: extract_block(volume, desc) }
    };

    #[cfg(feature = "parallel")]
    let blocks: Vec<Block> = {
        use rayon::prelude::*;
        // Indexed collect keeps ascending order.
        descriptors.par_iter().map(extract).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let blocks: Vec<Block> = descriptors.iter().map(extract).collect();

    Ok(blocks)
}

// ── Reassembly ────────────────────────────────────────────────────────────────

/// Write one brick's voxels back into a full-volume buffer at `offset`.
pub fn insert_block(
    target:     &mut [u8],
    volume:     Dimensions,
    components: usize,
    offset:     VoxelIndex,
    dimensions: Dimensions,
    data:       &[u8],
) -> Result<()> {
    let target_len = volume.checked_voxel_count()?.checked_mul(components);
    if target_len != Some(target.len()) {
        return Err(BvpError::BufferSizeMismatch {
            expected: target_len.unwrap_or(usize::MAX),
            got:      target.len(),
        });
    }
    let fits = |o: u32, d: u32, v: u32| o.checked_add(d).is_some_and(|end| end <= v);
    if !(fits(offset.x, dimensions.width, volume.width)
        && fits(offset.y, dimensions.height, volume.height)
        && fits(offset.z, dimensions.depth, volume.depth))
    {
        return Err(BvpError::InvalidDimensions(format!(
            "block {dimensions} at ({}, {}, {}) exceeds volume {volume}",
            offset.x, offset.y, offset.z
        )));
    }
    let expected = dimensions
        .checked_voxel_count()?
        .checked_mul(components)
        .ok_or_else(|| BvpError::InvalidDimensions(format!(
            "block {dimensions} with {components} components overflows"
        )))?;
    if data.len() != expected {
        return Err(BvpError::BufferSizeMismatch { expected, got: data.len() });
    }
    let row = dimensions.width as usize * components;
    if row == 0 {
        return Ok(());
    }
    for (r, chunk) in data.chunks_exact(row).enumerate() {
        let j = (r % dimensions.height as usize) as u32;
        let k = (r / dimensions.height as usize) as u32;
        let start = offset.offset_by(VoxelIndex::new(0, j, k)).flat(volume) * components;
        target[start..start + row].copy_from_slice(chunk);
    }
    Ok(())
}

/// Rebuild a full volume from its bricks.
pub fn reassemble(volume: Dimensions, components: usize, blocks: &[Block]) -> Result<VolumeBuffer> {
    let len = volume
        .checked_voxel_count()?
        .checked_mul(components)
        .ok_or_else(|| BvpError::InvalidDimensions(format!(
            "{volume} with {components} components overflows"
        )))?;
    let mut data = vec![0u8; len];
    for block in blocks {
        let d = &block.descriptor;
        insert_block(&mut data, volume, components, d.offset, d.dimensions, &block.data)?;
    }
    VolumeBuffer::new(data, volume, components)
}
