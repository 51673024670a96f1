pub mod error;
pub mod crc;
pub mod serial;
pub mod volume;
pub mod gradient;
pub mod combine;
pub mod blocker;
pub mod manifest;
pub mod zip;
pub mod convert;

pub use error::{BvpError, InputExtent, Result};
pub use volume::{Dimensions, VoxelIndex, VolumeBuffer};
pub use blocker::{partition, reassemble, Block, BlockDescriptor, BlockGrid};
pub use manifest::{Manifest, ManifestBuilder};
pub use convert::{convert, unpack, ConvertOptions, ConvertReport};
