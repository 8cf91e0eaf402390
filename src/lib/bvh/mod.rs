mod builder;
mod digest;
mod flatten;

pub use digest::PrimitiveDigest;

use std::{fmt, mem};

use crate::{bounds::Bounds3, geom};

// This stores all configuration options for construction of the BVH
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct BvhConfig {
    // Ranges larger than this are always split
    pub max_prims_in_node: usize,
    pub buckets: usize,
    // Cost of visiting a node relative to intersecting one primitive
    pub traversal_cost: f32,
}

impl BvhConfig {
    pub const fn new() -> Self {
        Self {
            max_prims_in_node: 4,
            buckets: 12,
            traversal_cost: 1.,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_prims_in_node == 0 {
            anyhow::bail!("BvhConfig::max_prims_in_node must be at least 1");
        }

        if self.buckets < 2 {
            anyhow::bail!("BvhConfig::buckets must be at least 2, got {}", self.buckets);
        }

        if !self.traversal_cost.is_finite() || self.traversal_cost < 0. {
            anyhow::bail!(
                "BvhConfig::traversal_cost must be finite and non-negative, got {}",
                self.traversal_cost
            );
        }

        Ok(())
    }
}

impl Default for BvhConfig {
    fn default() -> Self { Self::new() }
}

#[derive(Clone, Copy, Default)]
#[derive(Debug, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct BuildStats {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub interior_nodes: usize,
    pub max_depth: usize,
    pub max_leaf_size: usize,
}

/// One record of the flattened hierarchy, 48 bytes.
///
/// `primitive_count == 0` marks an interior node: its first child sits in
/// the next slot and `offset` holds the slot of the second child. For a leaf,
/// `offset` is the first triangle of the leaf in the reordered triangle buffer.
/// `axis` is only meaningful for interior nodes.
#[repr(C)]
#[derive(Clone, Copy)]
#[derive(bytemuck::Pod, bytemuck::Zeroable)]
#[derive(serde::Deserialize, serde::Serialize)]
#[derive(Debug, PartialEq)]
pub struct LinearBvhNode {
    pub bounds: Bounds3,
    pub offset: u32,
    pub primitive_count: u16,
    pub axis: u8,
    #[serde(skip)]
    _p0: u8,
    #[serde(skip)]
    _p1: [u32; 2],
}

const _: () = assert!(mem::size_of::<LinearBvhNode>() == 48);

impl LinearBvhNode {
    pub const fn leaf(bounds: Bounds3, offset: u32, primitive_count: u16) -> Self {
        Self {
            bounds,
            offset,
            primitive_count,
            axis: 0,
            _p0: 0,
            _p1: [0; 2],
        }
    }

    pub const fn interior(bounds: Bounds3, axis: u8, second_child: u32) -> Self {
        Self {
            bounds,
            offset: second_child,
            primitive_count: 0,
            axis,
            _p0: 0,
            _p1: [0; 2],
        }
    }

    pub fn is_leaf(&self) -> bool { self.primitive_count > 0 }

    // Range into the reordered triangle buffer
    pub fn primitives(&self) -> Option<std::ops::Range<usize>> {
        self.is_leaf().then(|| {
            let offset = self.offset as usize;

            offset..(offset + self.primitive_count as usize)
        })
    }
}

// The flattened hierarchy, ready to be handed to the device
#[derive(Clone)]
#[derive(Debug)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Bvh {
    pub nodes: Vec<LinearBvhNode>,
    pub stats: BuildStats,
}

impl Bvh {
    /// Builds the hierarchy and returns it together with the triangles,
    /// reordered so that every leaf covers a contiguous range.
    pub fn build(
        triangles: &[geom::Triangle],
        config: &BvhConfig,
    ) -> anyhow::Result<(Self, Vec<geom::Triangle>)> {
        Self::from_digests(triangles, PrimitiveDigest::from_triangles(triangles), config)
    }

    pub fn from_digests(
        triangles: &[geom::Triangle],
        digests: Vec<PrimitiveDigest>,
        config: &BvhConfig,
    ) -> anyhow::Result<(Self, Vec<geom::Triangle>)> {
        let start = chrono::Local::now();

        let builder::BuildTree {
            arena,
            root,
            ordered,
            stats,
        } = builder::Builder::new(config, triangles, digests)?.build()?;

        let (nodes, consumed) = flatten::flatten(&arena, root, stats.total_nodes);

        // A mismatch here is a defect in the builder or the flattener
        assert_eq!(
            consumed, stats.total_nodes,
            "flattened {} slots for a tree of {} nodes", consumed, stats.total_nodes
        );

        let elapsed = chrono::Local::now() - start;

        log::info!(
            "BVH created with {} nodes ({} leaves, {} interior) for {} triangles \
            ({:.3} MB, depth {}, {}ms elapsed)",
            stats.total_nodes,
            stats.leaf_nodes,
            stats.interior_nodes,
            ordered.len(),
            (nodes.len() * mem::size_of::<LinearBvhNode>()) as f32 / (1024. * 1024.),
            stats.max_depth,
            elapsed.num_milliseconds(),
        );

        Ok((Self { nodes, stats }, ordered))
    }

    pub fn root(&self) -> Option<&LinearBvhNode> { self.nodes.first() }

    pub fn leaves(&self) -> impl Iterator<Item = &LinearBvhNode> + '_ {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    // Slots of both children of an interior node
    pub fn children(&self, slot: usize) -> Option<[usize; 2]> {
        let node = self.nodes.get(slot)?;

        (!node.is_leaf()).then(|| [slot + 1, node.offset as usize])
    }

    // Checks a hierarchy that did not come straight out of the builder
    pub fn validate(&self, triangles: usize) -> anyhow::Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("BVH has no nodes");
        }

        if self.nodes.len() != self.stats.total_nodes {
            anyhow::bail!(
                "BVH holds {} nodes, but its statistics report {}",
                self.nodes.len(), self.stats.total_nodes
            );
        }

        let mut covered = 0;
        for (slot, node) in self.nodes.iter().enumerate() {
            match node.primitives() {
                Some(prims) if prims.end > triangles => anyhow::bail!(
                    "Leaf {} covers triangles {:?}, but only {} are present",
                    slot, prims, triangles
                ),
                Some(prims) => covered += prims.len(),
                None if node.axis > 2 => anyhow::bail!(
                    "Node {} splits along axis {}", slot, node.axis
                ),
                None => {
                    let snd = node.offset as usize;

                    // Pre-order: the second child follows the entire first subtree
                    if snd <= slot + 1 || snd >= self.nodes.len() {
                        anyhow::bail!(
                            "Node {} points to second child {} outside of {}..{}",
                            slot, snd, slot + 2, self.nodes.len()
                        );
                    }
                },
            }
        }

        if covered != triangles {
            anyhow::bail!(
                "BVH leaves cover {} triangles, but {} are present",
                covered, triangles
            );
        }

        Ok(())
    }
}

// Indented tree dump, used by the inspection tool
impl fmt::Display for Bvh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_node(
            bvh: &Bvh,
            f: &mut fmt::Formatter<'_>,
            slot: usize,
            indent: usize,
        ) -> fmt::Result {
            let node = &bvh.nodes[slot];

            let [x_min, y_min, z_min] = node.bounds.min;
            let [x_max, y_max, z_max] = node.bounds.max;

            match node.primitives() {
                Some(prims) => writeln!(
                    f,
                    "{}Leaf [{:.3}, {:.3}, {:.3}] [{:.3}, {:.3}, {:.3}]: {:?}",
                    " ".repeat(indent),
                    x_min, y_min, z_min,
                    x_max, y_max, z_max,
                    prims,
                ),
                None => {
                    writeln!(
                        f,
                        "{}Node({}) [{:.3}, {:.3}, {:.3}] [{:.3}, {:.3}, {:.3}]",
                        " ".repeat(indent),
                        ["x", "y", "z"][node.axis as usize % 3],
                        x_min, y_min, z_min,
                        x_max, y_max, z_max,
                    )?;

                    fmt_node(bvh, f, slot + 1, indent + 1)?;
                    fmt_node(bvh, f, node.offset as usize, indent + 1)
                },
            }
        }

        if self.nodes.is_empty() {
            return Ok(());
        }

        fmt_node(self, f, 0, 0)
    }
}
