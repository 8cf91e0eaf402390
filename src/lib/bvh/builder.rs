use std::ops::Range;

use super::{BuildStats, BvhConfig, PrimitiveDigest};

use crate::{bounds::Bounds3, geom};

// Children are referenced by their slot in the builder's arena.
// The arena is dropped as a whole once the tree has been flattened.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(self) -> usize { self.0 }

    #[cfg(test)]
    pub(super) fn from_index(index: usize) -> Self { Self(index) }
}

#[derive(Clone, Copy)]
#[derive(Debug)]
pub enum BuildNode {
    Leaf {
        bounds: Bounds3,
        offset: usize,
        count: usize,
    },
    Interior {
        bounds: Bounds3,
        axis: usize,
        children: [NodeHandle; 2],
    },
}

impl BuildNode {
    pub fn bounds(&self) -> Bounds3 {
        match self {
            Self::Leaf { bounds, .. } | //
            Self::Interior { bounds, .. } => *bounds,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Bucket {
    count: usize,
    bounds: Bounds3,
}

// Maps a centroid onto [0, buckets). A centroid sitting exactly on the
// upper edge of the centroid bounds lands in the last bucket.
pub(super) fn bucket_index(
    buckets: usize,
    centroid_bounds: &Bounds3,
    centroid: [f32; 3],
    axis: usize,
) -> usize {
    let offset = centroid_bounds.offset(centroid)[axis];

    let mut bucket = (buckets as f32 * offset) as i64;
    if bucket == buckets as i64 {
        bucket -= 1;
    }

    assert!(
        bucket >= 0 && bucket < buckets as i64,
        "bucket index {} outside of 0..{} (offset {})", bucket, buckets, offset
    );

    bucket as usize
}

// Cost of splitting after each bucket boundary
fn split_costs(buckets: &[Bucket], area: f32, traversal_cost: f32) -> Vec<f32> {
    let splits = buckets.len() - 1;

    let mut below = Vec::with_capacity(splits);
    let mut acc = Bucket::default();
    for bucket in &buckets[..splits] {
        acc.count += bucket.count;
        acc.bounds = acc.bounds.union(&bucket.bounds);

        below.push(acc);
    }

    let mut above = vec![Bucket::default(); splits];
    let mut acc = Bucket::default();
    for (idx, bucket) in buckets.iter().enumerate().skip(1).rev() {
        acc.count += bucket.count;
        acc.bounds = acc.bounds.union(&bucket.bounds);

        above[idx - 1] = acc;
    }

    below.iter().zip(above.iter()).map(|(b0, b1)| {
        let weighted = b0.count as f32 * b0.bounds.surface_area() +
            b1.count as f32 * b1.bounds.surface_area();

        traversal_cost + weighted / area
    }).collect()
}

pub struct BuildTree {
    pub arena: Vec<BuildNode>,
    pub root: NodeHandle,
    pub ordered: Vec<geom::Triangle>,
    pub stats: BuildStats,
}

pub struct Builder<'a> {
    config: &'a BvhConfig,
    triangles: &'a [geom::Triangle],
    digests: Vec<PrimitiveDigest>,
    arena: Vec<BuildNode>,
    ordered: Vec<geom::Triangle>,
    stats: BuildStats,
}

impl<'a> Builder<'a> {
    pub fn new(
        config: &'a BvhConfig,
        triangles: &'a [geom::Triangle],
        digests: Vec<PrimitiveDigest>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        if digests.is_empty() {
            anyhow::bail!("Unable to build a BVH over an empty primitive range");
        }

        if digests.len() != triangles.len() {
            anyhow::bail!(
                "Digest list covers {} primitives, but the scene has {} triangles",
                digests.len(), triangles.len()
            );
        }

        let mut seen = vec![false; triangles.len()];
        for digest in &digests {
            match seen.get_mut(digest.index) {
                Some(seen) if !*seen => *seen = true,
                Some(_) => anyhow::bail!(
                    "Triangle {} is referenced by more than one digest",
                    digest.index
                ),
                None => anyhow::bail!(
                    "Digest references triangle {}, but the scene has {} triangles",
                    digest.index, triangles.len()
                ),
            }
        }

        Ok(Self {
            config,
            triangles,
            arena: Vec::with_capacity(2 * digests.len() - 1),
            ordered: Vec::with_capacity(triangles.len()),
            digests,
            stats: BuildStats::default(),
        })
    }

    pub fn build(mut self) -> anyhow::Result<BuildTree> {
        let root = self.recursive_build(0..self.digests.len(), 0)?;

        self.stats.total_nodes = self.arena.len();

        let Self { arena, ordered, stats, .. } = self;

        Ok(BuildTree { arena, root, ordered, stats })
    }

    fn push(&mut self, node: BuildNode) -> NodeHandle {
        self.arena.push(node);

        NodeHandle(self.arena.len() - 1)
    }

    fn leaf(
        &mut self,
        range: Range<usize>,
        bounds: Bounds3,
        depth: usize,
    ) -> anyhow::Result<NodeHandle> {
        let count = range.len();

        // The node record only has 16 bits for the primitive count
        if count > u16::MAX as usize {
            anyhow::bail!(
                "Leaf would hold {} primitives with coincident centroids, \
                more than a node can address ({})",
                count, u16::MAX
            );
        }

        let offset = self.ordered.len();

        let triangles = self.triangles;
        self.ordered.extend({
            self.digests[range].iter().map(|digest| triangles[digest.index])
        });

        self.stats.leaf_nodes += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);
        self.stats.max_leaf_size = self.stats.max_leaf_size.max(count);

        Ok(self.push(BuildNode::Leaf { bounds, offset, count }))
    }

    fn recursive_build(
        &mut self,
        range: Range<usize>,
        depth: usize,
    ) -> anyhow::Result<NodeHandle> {
        assert!(!range.is_empty(), "empty primitive range {:?}", range);

        let count = range.len();

        let (bounds, centroid_bounds) = self.digests[range.clone()]
            .iter()
            .fold((Bounds3::empty(), Bounds3::empty()), |(bounds, centroids), digest| {
                (bounds.union(&digest.bounds), centroids.union_point(digest.centroid))
            });

        if count == 1 {
            return self.leaf(range, bounds, depth);
        }

        let axis = centroid_bounds.maximum_extent();

        // Every centroid coincides, there is nothing to split on
        if centroid_bounds.max[axis] == centroid_bounds.min[axis] {
            return self.leaf(range, bounds, depth);
        }

        let mid = if count <= 2 {
            let mid = (range.start + range.end) / 2;

            self.digests[range.clone()].select_nth_unstable_by(mid - range.start, |a, b| {
                a.centroid[axis].total_cmp(&b.centroid[axis])
            });

            mid
        } else {
            match self.sah_split(range.clone(), &bounds, &centroid_bounds, axis) {
                Some(mid) => mid,
                None => return self.leaf(range, bounds, depth),
            }
        };

        let fst = self.recursive_build(range.start..mid, depth + 1)?;
        let snd = self.recursive_build(mid..range.end, depth + 1)?;

        let bounds = self.arena[fst.0].bounds().union(&self.arena[snd.0].bounds());

        self.stats.interior_nodes += 1;

        Ok(self.push(BuildNode::Interior { bounds, axis, children: [fst, snd] }))
    }

    // Returns the partition point, or None if a leaf is cheaper than any split
    fn sah_split(
        &mut self,
        range: Range<usize>,
        bounds: &Bounds3,
        centroid_bounds: &Bounds3,
        axis: usize,
    ) -> Option<usize> {
        let BvhConfig {
            max_prims_in_node,
            buckets: bucket_count,
            traversal_cost,
        } = *self.config;

        let count = range.len();

        let mut buckets = vec![Bucket::default(); bucket_count];
        for digest in &self.digests[range.clone()] {
            let bucket = &mut buckets[{
                bucket_index(bucket_count, centroid_bounds, digest.centroid, axis)
            }];

            bucket.count += 1;
            bucket.bounds = bucket.bounds.union(&digest.bounds);
        }

        let costs = split_costs(&buckets, bounds.surface_area(), traversal_cost);

        // Ties keep the lowest boundary
        let (split, min_cost) = costs
            .iter()
            .copied()
            .enumerate()
            .skip(1)
            .fold((0, costs[0]), |(best, best_cost), (idx, cost)| {
                if cost < best_cost { (idx, cost) } else { (best, best_cost) }
            });

        let leaf_cost = count as f32;
        if count <= max_prims_in_node && !(min_cost < leaf_cost) {
            return None;
        }

        let below = itertools::partition(&mut self.digests[range.clone()], |digest| {
            bucket_index(bucket_count, centroid_bounds, digest.centroid, axis) <= split
        });

        assert!(
            below > 0 && below < count,
            "SAH partition after bucket {} left a side empty ({} of {})", split, below, count
        );

        Some(range.start + below)
    }
}
