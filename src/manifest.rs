//! `manifest.json`: how the bricks of an archive reassemble into a volume.
//!
//! ```json
//! { "meta": { "name": "...", "comment": "...", "version": 1 },
//!   "modalities": [ { "name": "default",
//!                     "dimensions": { "width": 4, "height": 4, "depth": 4 },
//!                     "components": 1, "format": "uint8",
//!                     "transform": { "matrix": [ 16 floats, row-major ] },
//!                     "placements": [ { "index": 0, "position": { "x": 0, "y": 0, "z": 0 } } ] } ],
//!   "blocks": [ { "url": "blocks/block-0.raw", "format": "raw",
//!                 "dimensions": { "width": 2, "height": 2, "depth": 2 } } ] }
//! ```
//!
//! `blocks[i]` and `placements[i]` describe the same brick.

use serde::{Deserialize, Serialize};

use crate::blocker::BlockDescriptor;
use crate::error::{BvpError, Result};
use crate::volume::{Dimensions, VoxelIndex, GRADIENT_COMPONENTS, SCALAR_COMPONENTS};

/// Archive path of the manifest entry.
pub const MANIFEST_NAME: &str = "manifest.json";
/// Archive directory holding the brick entries.
pub const BLOCKS_DIR: &str = "blocks";
pub const MANIFEST_VERSION: u32 = 1;
pub const VOXEL_FORMAT: &str = "uint8";
pub const BLOCK_FORMAT: &str = "raw";

/// File name of brick `index` inside [`BLOCKS_DIR`].
pub fn block_file_name(index: usize) -> String {
    format!("block-{index}.raw")
}

/// Full archive path (and manifest `url`) of brick `index`.
pub fn block_url(index: usize) -> String {
    format!("{BLOCKS_DIR}/{}", block_file_name(index))
}

// ── Document types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub meta:       Meta,
    pub modalities: Vec<Modality>,
    pub blocks:     Vec<BlockMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub name:    String,
    pub comment: String,
    pub version: u32,
}

impl Meta {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self { name: name.into(), comment: comment.into(), version: MANIFEST_VERSION }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modality {
    pub name:       String,
    pub dimensions: Dimensions,
    pub components: usize,
    pub format:     String,
    pub transform:  Transform,
    pub placements: Vec<Placement>,
}

/// Row-major 4×4 voxel-to-world matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub matrix: [f32; 16],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        let mut matrix = [0.0; 16];
        for (r, row) in rows.iter().enumerate() {
            matrix[r * 4..r * 4 + 4].copy_from_slice(row);
        }
        Self { matrix }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub index:    usize,
    pub position: VoxelIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    pub url:        String,
    pub format:     String,
    pub dimensions: Dimensions,
}

impl Manifest {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The single modality this format carries.
    pub fn modality(&self) -> Result<&Modality> {
        match self.modalities.as_slice() {
            [m] => Ok(m),
            other => Err(BvpError::InvalidArchive(format!(
                "expected exactly one modality, found {}",
                other.len()
            ))),
        }
    }

    /// Check formats, and that bricks and placements pair up and stay inside the volume.
    pub fn validate(&self) -> Result<()> {
        let modality = self.modality()?;
        if modality.components != SCALAR_COMPONENTS && modality.components != GRADIENT_COMPONENTS {
            return Err(BvpError::InvalidArchive(format!(
                "unsupported component count {}",
                modality.components
            )));
        }
        if modality.format != VOXEL_FORMAT {
            return Err(BvpError::InvalidArchive(format!("unsupported voxel format {:?}", modality.format)));
        }
        if modality.placements.len() != self.blocks.len() {
            return Err(BvpError::InvalidArchive(format!(
                "{} placements for {} blocks",
                modality.placements.len(),
                self.blocks.len()
            )));
        }
        let vol = modality.dimensions;
        for (placement, block) in modality.placements.iter().zip(&self.blocks) {
            if block.format != BLOCK_FORMAT {
                return Err(BvpError::InvalidArchive(format!(
                    "{}: unsupported block format {:?}",
                    block.url, block.format
                )));
            }
            if block.url != block_url(placement.index) {
                return Err(BvpError::InvalidArchive(format!(
                    "placement {} does not match block url {}",
                    placement.index, block.url
                )));
            }
            let p = placement.position;
            let d = block.dimensions;
            let inside = |o: u32, e: u32, v: u32| o as u64 + e as u64 <= v as u64;
            if !(inside(p.x, d.width, vol.width)
                && inside(p.y, d.height, vol.height)
                && inside(p.z, d.depth, vol.depth))
            {
                return Err(BvpError::InvalidArchive(format!(
                    "block {} ({d}) at ({}, {}, {}) exceeds volume {vol}",
                    placement.index, p.x, p.y, p.z
                )));
            }
        }
        Ok(())
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Aggregates run metadata and brick layout into a [`Manifest`].
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    meta:          Meta,
    modality_name: String,
    dimensions:    Dimensions,
    components:    usize,
    transform:     Transform,
}

impl ManifestBuilder {
    pub fn new(meta: Meta, modality_name: impl Into<String>, dimensions: Dimensions, components: usize) -> Self {
        Self {
            meta,
            modality_name: modality_name.into(),
            dimensions,
            components,
            transform: Transform::IDENTITY,
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Produce the manifest; both lists come out in ascending brick index.
    pub fn build<'a, I>(self, descriptors: I) -> Manifest
    where
        I: IntoIterator<Item = &'a BlockDescriptor>,
    {
        let mut ordered: Vec<&BlockDescriptor> = descriptors.into_iter().collect();
        ordered.sort_by_key(|d| d.index);

        let placements = ordered
            .iter()
            .map(|d| Placement { index: d.index, position: d.offset })
            .collect();
        let blocks = ordered
            .iter()
            .map(|d| BlockMeta {
                url:        block_url(d.index),
                format:     BLOCK_FORMAT.to_owned(),
                dimensions: d.dimensions,
            })
            .collect();

        Manifest {
            meta: self.meta,
            modalities: vec![Modality {
                name:       self.modality_name,
                dimensions: self.dimensions,
                components: self.components,
                format:     VOXEL_FORMAT.to_owned(),
                transform:  self.transform,
                placements,
            }],
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocker::BlockGrid;

    fn sample() -> Manifest {
        let dims = Dimensions::new(3, 2, 2);
        let grid = BlockGrid::new(dims, 2).unwrap();
        let descs: Vec<_> = grid.descriptors(1).collect();
        ManifestBuilder::new(Meta::new("Volume", "test"), "default", dims, 1).build(&descs)
    }

    #[test]
    fn placements_follow_blocks() {
        let m = sample();
        let modality = m.modality().unwrap();
        assert_eq!(m.blocks.len(), 2);
        assert_eq!(modality.placements[1], Placement { index: 1, position: VoxelIndex::new(2, 0, 0) });
        assert_eq!(m.blocks[1].url, "blocks/block-1.raw");
        assert_eq!(m.blocks[1].dimensions, Dimensions::new(1, 2, 2));
        m.validate().unwrap();
    }

    #[test]
    fn build_sorts_by_index() {
        let grid = BlockGrid::new(Dimensions::cube(4), 2).unwrap();
        let mut descs: Vec<_> = grid.descriptors(1).collect();
        descs.reverse();
        let m = ManifestBuilder::new(Meta::new("v", ""), "m", Dimensions::cube(4), 1).build(&descs);
        let indices: Vec<_> = m.modalities[0].placements.iter().map(|p| p.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn empty_layout_is_valid() {
        let none: Vec<BlockDescriptor> = Vec::new();
        let m = ManifestBuilder::new(Meta::new("v", ""), "m", Dimensions::new(0, 0, 0), 1).build(&none);
        assert!(m.blocks.is_empty());
        assert!(m.modalities[0].placements.is_empty());
        m.validate().unwrap();
    }

    #[test]
    fn json_schema_shape() {
        let json: serde_json::Value = serde_json::from_slice(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["meta"]["version"], 1);
        assert_eq!(json["modalities"][0]["format"], "uint8");
        assert_eq!(json["modalities"][0]["dimensions"]["width"], 3);
        assert_eq!(json["modalities"][0]["transform"]["matrix"].as_array().unwrap().len(), 16);
        assert_eq!(json["modalities"][0]["placements"][1]["position"]["x"], 2);
        assert_eq!(json["blocks"][0]["format"], "raw");
    }

    #[test]
    fn json_roundtrip() {
        let m = sample();
        assert_eq!(Manifest::from_json(&m.to_json().unwrap()).unwrap(), m);
    }

    #[test]
    fn validate_catches_mismatched_url() {
        let mut m = sample();
        m.blocks[0].url = "blocks/block-9.raw".into();
        assert!(matches!(m.validate(), Err(BvpError::InvalidArchive(_))));
    }

    #[test]
    fn validate_rejects_foreign_formats() {
        let mut m = sample();
        m.modalities[0].components = 9_223_372_036_854_775_808;
        assert!(matches!(m.validate(), Err(BvpError::InvalidArchive(_))));

        let mut m = sample();
        m.modalities[0].components = 3;
        assert!(matches!(m.validate(), Err(BvpError::InvalidArchive(_))));

        let mut m = sample();
        m.modalities[0].format = "float32".into();
        assert!(matches!(m.validate(), Err(BvpError::InvalidArchive(_))));

        let mut m = sample();
        m.blocks[1].format = "gzip".into();
        assert!(matches!(m.validate(), Err(BvpError::InvalidArchive(_))));

        let mut m = sample();
        m.modalities[0].components = 4;
        m.validate().unwrap();
    }

    #[test]
    fn transform_from_rows() {
        let t = Transform::from_rows([
            [2.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(t.matrix[0], 2.0);
        assert_eq!(t.matrix[3], 5.0);
    }
}
