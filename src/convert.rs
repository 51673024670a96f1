//! End-to-end conversion: raw volume in, bricked archive out.
//!
//! ```no_run
//! use bvpack::convert::{convert, ConvertOptions};
//! use bvpack::volume::Dimensions;
//!
//! let opts = ConvertOptions {
//!     dimensions: Dimensions::new(256, 256, 128),
//!     gradient:   true,
//!     ..ConvertOptions::default()
//! };
//! let input  = std::fs::File::open("head.raw")?;
//! let output = std::fs::File::create("head.bvp")?;
//! let report = convert(input, output, &opts)?;
//! println!("{} blocks", report.block_count);
//! # Ok::<(), bvpack::BvpError>(())
//! ```

use std::io::{Read, Write};

use crate::blocker::{insert_block, partition, Block, DEFAULT_BLOCK_SIZE};
use crate::combine::attach_gradient;
use crate::error::{BvpError, Result};
use crate::gradient::{compute_gradient, GradientKernel};
use crate::manifest::{
    block_file_name, Manifest, ManifestBuilder, Meta, Transform, BLOCKS_DIR, MANIFEST_NAME,
};
use crate::volume::{read_volume, Dimensions, VolumeBuffer};
use crate::zip::{write_archive, ArchiveNode, ArchiveSummary, ZipArchive};

pub const DEFAULT_MODALITY_NAME: &str = "default";
pub const DEFAULT_VOLUME_NAME: &str = "Volume";
pub const DEFAULT_VOLUME_COMMENT: &str = "Volume generated with raw2bvp";

// ── ConvertOptions ────────────────────────────────────────────────────────────

/// Configuration for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub dimensions:     Dimensions,
    pub block_size:     u32,
    /// Attach a quantized gradient channel (4 components per voxel).
    pub gradient:       bool,
    pub kernel:         GradientKernel,
    pub modality_name:  String,
    pub volume_name:    String,
    pub volume_comment: String,
    pub transform:      Transform,
    /// Also emit an empty `blocks/` directory entry ahead of the bricks.
    pub directory_entry: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            dimensions:      Dimensions::default(),
            block_size:      DEFAULT_BLOCK_SIZE,
            gradient:        false,
            kernel:          GradientKernel::default(),
            modality_name:   DEFAULT_MODALITY_NAME.to_owned(),
            volume_name:     DEFAULT_VOLUME_NAME.to_owned(),
            volume_comment:  DEFAULT_VOLUME_COMMENT.to_owned(),
            transform:       Transform::IDENTITY,
            directory_entry: false,
        }
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

/// Everything an archive is made of, before serialization.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub manifest: Manifest,
    pub blocks:   Vec<Block>,
    directory_entry: bool,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct ConvertReport {
    pub dimensions:  Dimensions,
    pub components:  usize,
    pub block_count: usize,
    pub archive:     ArchiveSummary,
}

/// Gradient, interleave and partition a scalar volume.
pub fn prepare(volume: VolumeBuffer, opts: &ConvertOptions) -> Result<Conversion> {
    let volume = if opts.gradient {
        let gradient = compute_gradient(&volume, opts.kernel)?;
        attach_gradient(volume, &gradient)?
    } else {
        volume
    };

    let blocks = partition(&volume, opts.block_size)?;
    let manifest = ManifestBuilder::new(
        Meta::new(opts.volume_name.as_str(), opts.volume_comment.as_str()),
        opts.modality_name.as_str(),
        volume.dimensions(),
        volume.components(),
    )
    .transform(opts.transform)
    .build(blocks.iter().map(|b| &b.descriptor));

    Ok(Conversion { manifest, blocks, directory_entry: opts.directory_entry })
}

impl Conversion {
    /// The archive tree: `manifest.json` first, then every brick in index order.
    pub fn into_nodes(self) -> Result<Vec<ArchiveNode>> {
        let mut blocks = self.blocks;
        blocks.sort_by_key(|b| b.descriptor.index);

        let mut nodes = Vec::with_capacity(blocks.len() + 1);
        nodes.push(ArchiveNode::file(MANIFEST_NAME, self.manifest.to_json()?));
        if self.directory_entry {
            let children = blocks
                .into_iter()
                .map(|b| ArchiveNode::file(block_file_name(b.descriptor.index), b.data))
                .collect();
            nodes.push(ArchiveNode::directory(BLOCKS_DIR, children));
        } else {
            nodes.extend(blocks.into_iter().map(|b| {
                ArchiveNode::file(format!("{BLOCKS_DIR}/{}", block_file_name(b.descriptor.index)), b.data)
            }));
        }
        Ok(nodes)
    }

    pub fn write_to<W: Write>(self, sink: W) -> Result<(W, ArchiveSummary)> {
        write_archive(self.into_nodes()?, sink)
    }
}

/// Read a raw volume from `input` and write its archive to `output`.
///
/// The input is read and size-checked in full before any byte is written.
pub fn convert<R: Read, W: Write>(input: R, output: W, opts: &ConvertOptions) -> Result<ConvertReport> {
    let volume = read_volume(input, opts.dimensions)?;
    let conversion = prepare(volume, opts)?;

    let modality = conversion.manifest.modality()?;
    let dimensions = modality.dimensions;
    let components = modality.components;
    let block_count = conversion.blocks.len();

    let (_, archive) = conversion.write_to(output)?;
    log::info!(
        "wrote {} entries ({} bytes) for {dimensions} volume, {components} component(s)",
        archive.entries.len(),
        archive.total_len
    );
    Ok(ConvertReport { dimensions, components, block_count, archive })
}

// ── Unpacking ─────────────────────────────────────────────────────────────────

/// Parse an archive, check it, and rebuild the full volume from its bricks.
///
/// Every brick payload is checked against the manifest before the volume
/// buffer is allocated, so its size is bounded by the archive itself.
pub fn unpack(bytes: &[u8]) -> Result<(Manifest, VolumeBuffer)> {
    let archive = ZipArchive::parse(bytes)?;
    let manifest = Manifest::from_json(archive.read(MANIFEST_NAME)?)?;
    manifest.validate()?;

    let modality = manifest.modality()?;
    let dims = modality.dimensions;
    let components = modality.components;
    let overflow = |what: String| BvpError::InvalidArchive(format!("{what} overflows"));

    let mut payloads = Vec::with_capacity(manifest.blocks.len());
    let mut covered = 0usize;
    for (placement, block) in modality.placements.iter().zip(&manifest.blocks) {
        let payload = archive.read(&block.url)?;
        let expected = block
            .dimensions
            .checked_voxel_count()
            .ok()
            .and_then(|n| n.checked_mul(components))
            .ok_or_else(|| overflow(format!("{} ({})", block.url, block.dimensions)))?;
        if payload.len() != expected {
            return Err(BvpError::InvalidArchive(format!(
                "{}: expected {expected} bytes, found {}",
                block.url,
                payload.len()
            )));
        }
        covered = covered
            .checked_add(expected)
            .ok_or_else(|| overflow("total block size".to_owned()))?;
        payloads.push((placement.position, block.dimensions, payload));
    }

    let total = dims
        .checked_voxel_count()
        .ok()
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| overflow(format!("volume {dims}")))?;
    if covered != total {
        return Err(BvpError::InvalidArchive(format!(
            "blocks hold {covered} bytes but a {dims} volume needs {total}"
        )));
    }

    let mut data = vec![0u8; total];
    for (position, block_dims, payload) in payloads {
        insert_block(&mut data, dims, components, position, block_dims, payload)?;
    }

    let volume = VolumeBuffer::new(data, dims, components)?;
    Ok((manifest, volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::block_url;
    use crate::zip::{write_entries, ArchiveEntry};

    #[test]
    fn defaults() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.block_size, 128);
        assert!(!opts.gradient);
        assert_eq!(opts.modality_name, "default");
        assert_eq!(opts.volume_name, "Volume");
        assert_eq!(opts.transform, Transform::IDENTITY);
    }

    #[test]
    fn gradient_run_has_four_components() {
        let dims = Dimensions::cube(3);
        let opts = ConvertOptions { dimensions: dims, block_size: 2, gradient: true, ..Default::default() };
        let conv = prepare(VolumeBuffer::filled(dims, 10), &opts).unwrap();
        assert_eq!(conv.manifest.modalities[0].components, 4);
        assert_eq!(conv.blocks.len(), 8);
        // Brick 7 holds only the far corner voxel, which is on the shell.
        assert_eq!(conv.blocks[7].data, vec![10, 0, 0, 0]);
    }

    #[test]
    fn directory_entry_is_optional() {
        let dims = Dimensions::cube(2);
        let opts = ConvertOptions { dimensions: dims, block_size: 1, directory_entry: true, ..Default::default() };
        let nodes = prepare(VolumeBuffer::filled(dims, 1), &opts).unwrap().into_nodes().unwrap();
        let entries = crate::zip::flatten(nodes);
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[1].name, "blocks/");
        assert_eq!(entries[2].name, "blocks/block-0.raw");
    }

    #[test]
    fn input_mismatch_writes_nothing() {
        let opts = ConvertOptions { dimensions: Dimensions::cube(2), ..Default::default() };
        let mut out = Vec::new();
        let err = convert(&[0u8; 7][..], &mut out, &opts).unwrap_err();
        assert!(matches!(err, BvpError::InputSizeMismatch { expected: 8, .. }));
        assert!(out.is_empty());
    }

    fn archive_with_manifest(edit: impl FnOnce(&mut Manifest)) -> Vec<u8> {
        let dims = Dimensions::new(2, 1, 1);
        let opts = ConvertOptions { dimensions: dims, block_size: 2, ..Default::default() };
        let conv = prepare(VolumeBuffer::filled(dims, 3), &opts).unwrap();
        let mut manifest = conv.manifest.clone();
        edit(&mut manifest);

        let mut entries = vec![ArchiveEntry::new(MANIFEST_NAME, manifest.to_json().unwrap())];
        entries.extend(conv.blocks.into_iter().map(|b| ArchiveEntry::new(block_url(b.descriptor.index), b.data)));
        write_entries(entries, Vec::new()).unwrap().0
    }

    #[test]
    fn unpack_accepts_well_formed_manifest() {
        let (_, volume) = unpack(&archive_with_manifest(|_| {})).unwrap();
        assert_eq!(volume.data(), &[3, 3]);
    }

    #[test]
    fn unpack_rejects_hostile_component_count() {
        let bytes = archive_with_manifest(|m| m.modalities[0].components = 9_223_372_036_854_775_808);
        assert!(matches!(unpack(&bytes), Err(BvpError::InvalidArchive(_))));
    }

    #[test]
    fn unpack_rejects_oversized_volume() {
        // A huge extent with no bricks to back it must fail before allocating.
        let bytes = archive_with_manifest(|m| {
            m.modalities[0].dimensions = Dimensions::cube(u32::MAX);
            m.modalities[0].placements.clear();
            m.blocks.clear();
        });
        assert!(matches!(unpack(&bytes), Err(BvpError::InvalidArchive(_))));
    }

    #[test]
    fn unpack_rejects_short_block() {
        let bytes = archive_with_manifest(|m| m.modalities[0].components = 4);
        let err = unpack(&bytes).unwrap_err();
        assert!(matches!(err, BvpError::InvalidArchive(msg) if msg.contains("expected 8 bytes")));
    }
}
