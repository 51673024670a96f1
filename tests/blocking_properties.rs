use bvpack::blocker::{partition, reassemble, BlockGrid};
use bvpack::gradient::{compute_gradient, GradientKernel};
use bvpack::volume::{Dimensions, VolumeBuffer, VoxelIndex};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn volume_strategy() -> impl Strategy<Value = (VolumeBuffer, u32)> {
    (1u32..12, 1u32..12, 1u32..12, 1usize..=4, 1u32..14).prop_flat_map(|(w, h, d, c, b)| {
        let dims = Dimensions::new(w, h, d);
        let comps = if c == 4 { 4 } else { 1 };
        proptest::collection::vec(any::<u8>(), dims.voxel_count() * comps).prop_map(move |data| {
            (VolumeBuffer::new(data, dims, comps).unwrap(), b)
        })
    })
}

proptest! {
    #[test]
    fn blocks_reassemble_to_source((volume, block_size) in volume_strategy()) {
        let blocks = partition(&volume, block_size).unwrap();
        let rebuilt = reassemble(volume.dimensions(), volume.components(), &blocks).unwrap();
        prop_assert_eq!(rebuilt, volume);
    }

    #[test]
    fn block_indices_are_a_bijection(w in 0u32..40, h in 0u32..40, d in 0u32..40, b in 1u32..17) {
        let grid = BlockGrid::new(Dimensions::new(w, h, d), b).unwrap();
        let expected = (w.div_ceil(b) * h.div_ceil(b) * d.div_ceil(b)) as usize;
        let indices: Vec<usize> = grid.descriptors(1).map(|desc| desc.index).collect();
        prop_assert_eq!(indices.len(), expected);
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        prop_assert_eq!(unique, (0..expected).collect::<BTreeSet<_>>());
        prop_assert!(indices.windows(2).all(|p| p[0] < p[1]));
    }

    #[test]
    fn blocks_tile_without_overlap(w in 1u32..20, h in 1u32..20, d in 1u32..20, b in 1u32..9) {
        let dims = Dimensions::new(w, h, d);
        let grid = BlockGrid::new(dims, b).unwrap();
        let mut covered = vec![0u8; dims.voxel_count()];
        for desc in grid.descriptors(1) {
            prop_assert!(desc.offset.x + desc.dimensions.width <= w);
            prop_assert!(desc.offset.y + desc.dimensions.height <= h);
            prop_assert!(desc.offset.z + desc.dimensions.depth <= d);
            for z in 0..desc.dimensions.depth {
                for y in 0..desc.dimensions.height {
                    for x in 0..desc.dimensions.width {
                        covered[desc.offset.offset_by(VoxelIndex::new(x, y, z)).flat(dims)] += 1;
                    }
                }
            }
        }
        prop_assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn shell_gradient_is_zero(w in 1u32..8, h in 1u32..8, d in 1u32..8, seed in any::<u8>()) {
        let dims = Dimensions::new(w, h, d);
        let data: Vec<u8> = (0..dims.voxel_count()).map(|i| (i as u8).wrapping_mul(37) ^ seed).collect();
        let volume = VolumeBuffer::scalar(data, dims).unwrap();
        let gradient = compute_gradient(&volume, GradientKernel::Sobel).unwrap();
        prop_assert_eq!(gradient.len(), dims.voxel_count() * 3);
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    let idx = VoxelIndex::new(x, y, z);
                    if dims.is_boundary(idx) {
                        let at = idx.flat(dims) * 3;
                        prop_assert_eq!(&gradient[at..at + 3], &[0u8, 0, 0][..]);
                    }
                }
            }
        }
    }
}
