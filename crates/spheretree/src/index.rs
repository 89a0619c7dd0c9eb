//! The bounding-sphere hierarchy.
//!
//! [`GeometryIndex::build`] partitions the carriers of a finalized
//! [`DetectorGeometry`] with [`BalancedSplit`] until each cluster holds a
//! single carrier, then explodes that carrier into one sphere per sensor.
//!
//! Construction is iterative: pending clusters sit on an explicit work stack,
//! so pathological inputs cannot exhaust the call stack. Nodes are stored in
//! an arena in creation order; the root is always slot 0.

use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cluster::BalancedSplit;
use crate::error::ConfigurationError;
use crate::node::{BoundingNode, NodeId, NodeKind};
use crate::sensor::{CarrierId, DetectorGeometry, SensorId};
use crate::Sphere;

/// Configuration for index construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Seed for candidate-centre sampling
    pub seed: u64,
    /// Rejected partitions before the balance bound is relaxed
    pub relax_after: u32,
    /// Rejected partitions before the widest-axis halving takes over
    pub fallback_after: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            seed: 0x004B_4D33,
            relax_after: 1000,
            fallback_after: 10_000,
        }
    }
}

impl IndexConfig {
    /// Same config with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn splitter(&self) -> BalancedSplit {
        BalancedSplit::new(self.relax_after, self.fallback_after.max(self.relax_after + 1))
    }
}

/// Structural statistics of a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of nodes
    pub node_count: usize,
    /// Internal (two-way split) nodes
    pub internal_count: usize,
    /// Carrier leaves
    pub carrier_count: usize,
    /// Sensor terminals
    pub sensor_count: usize,
    /// Deepest node depth
    pub max_depth: u16,
    /// Splits accepted under a relaxed balance bound
    pub relaxed_count: usize,
}

/// A sensor found outside one of its ancestors' spheres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnclosureViolation {
    /// Ancestor node whose sphere is too small
    pub node: NodeId,
    /// Sensor poking out of it
    pub sensor: SensorId,
    /// How far the sensor sphere extends beyond the node sphere
    pub excess: f64,
}

/// Binary bounding-sphere tree over the detector's carriers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryIndex {
    nodes: Vec<BoundingNode>,
    config: IndexConfig,
}

/// A cluster waiting to be turned into a node.
struct Pending {
    carriers: Vec<CarrierId>,
    depth: u16,
    /// Parent internal node and which of its two child slots to fill
    parent: Option<(NodeId, usize)>,
}

fn next_id(nodes: &[BoundingNode]) -> NodeId {
    #[allow(clippy::cast_possible_truncation)]
    NodeId::new(nodes.len() as u32)
}

impl GeometryIndex {
    /// Build the hierarchy over every carrier of `geometry`.
    ///
    /// # Errors
    ///
    /// Fails if the geometry is not finalized, has no carriers, or a carrier
    /// owns no sensors.
    pub fn build(
        geometry: &DetectorGeometry,
        config: &IndexConfig,
    ) -> Result<Self, ConfigurationError> {
        if !geometry.is_finalized() {
            return Err(ConfigurationError::NotFinalized);
        }
        let carriers = geometry.carriers();
        if carriers.is_empty() {
            return Err(ConfigurationError::EmptyCarrierList);
        }
        if let Some(empty) = carriers.iter().find(|c| c.sensors.is_empty()) {
            return Err(ConfigurationError::EmptyCarrier(empty.id));
        }

        let splitter = config.splitter();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut nodes: Vec<BoundingNode> =
            Vec::with_capacity(2 * carriers.len() + geometry.sensor_count());

        let mut stack = vec![Pending {
            carriers: carriers.iter().map(|c| c.id).collect(),
            depth: 0,
            parent: None,
        }];

        while let Some(Pending {
            carriers: members,
            depth,
            parent,
        }) = stack.pop()
        {
            let id = next_id(&nodes);
            if let Some((parent, slot)) = parent {
                if let NodeKind::Internal { children, .. } = &mut nodes[parent.index()].kind {
                    children[slot] = id;
                }
            }

            // Cluster sphere: centroid of carrier positions, covering every carrier sphere
            let spheres: Vec<Sphere> = members
                .iter()
                .map(|c| carriers[c.index()].bounding_sphere())
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let centroid =
                spheres.iter().map(|s| s.center).sum::<DVec3>() / spheres.len() as f64;
            let sphere = Sphere::enclosing(centroid, spheres.iter().copied());
            #[allow(clippy::cast_possible_truncation)]
            let carrier_count = members.len() as u32;

            if let [only] = members.as_slice() {
                let carrier = &carriers[only.index()];
                let first_sensor = id.index() + 1;
                #[allow(clippy::cast_possible_truncation)]
                let sensor_nodes: Vec<NodeId> = (0..carrier.sensors.len())
                    .map(|k| NodeId::new((first_sensor + k) as u32))
                    .collect();
                nodes.push(BoundingNode {
                    sphere,
                    depth,
                    carrier_count,
                    kind: NodeKind::Carrier {
                        carrier: carrier.id,
                        sensors: sensor_nodes,
                    },
                });
                for sensor_id in &carrier.sensors {
                    let sensor = geometry
                        .sensor(*sensor_id)
                        .ok_or(ConfigurationError::UnknownSensor(*sensor_id))?;
                    nodes.push(BoundingNode {
                        sphere: sensor.bounding_sphere(),
                        depth: depth + 1,
                        carrier_count: 0,
                        kind: NodeKind::Sensor { sensor: sensor.id },
                    });
                }
                continue;
            }

            let positions: Vec<DVec3> = spheres.iter().map(|s| s.center).collect();
            let outcome = splitter.split(&positions, &sphere, &mut rng);
            if outcome.fallback {
                warn!(
                    depth,
                    carriers = members.len(),
                    rejected = outcome.rejected,
                    "no balanced clustering found, halving along widest axis"
                );
            } else if outcome.relaxed {
                warn!(
                    depth,
                    carriers = members.len(),
                    minority = outcome.minority(),
                    rejected = outcome.rejected,
                    "accepted split under relaxed balance bound"
                );
            } else {
                debug!(
                    depth,
                    carriers = members.len(),
                    left = outcome.groups[0].len(),
                    right = outcome.groups[1].len(),
                    rejected = outcome.rejected,
                    "split cluster"
                );
            }

            nodes.push(BoundingNode {
                sphere,
                depth,
                carrier_count,
                kind: NodeKind::Internal {
                    children: [id, id],
                    relaxed: outcome.relaxed,
                },
            });

            // Push the second group first so the first group is built first
            let [first, second] = outcome.groups;
            for (slot, group) in [(1, second), (0, first)] {
                stack.push(Pending {
                    carriers: group.into_iter().map(|i| members[i]).collect(),
                    depth: depth + 1,
                    parent: Some((id, slot)),
                });
            }
        }

        let index = Self {
            nodes,
            config: *config,
        };
        let stats = index.stats();
        info!(
            carriers = stats.carrier_count,
            sensors = stats.sensor_count,
            nodes = stats.node_count,
            max_depth = stats.max_depth,
            relaxed = stats.relaxed_count,
            root_radius = index.root().sphere.radius,
            "built geometry index"
        );
        Ok(index)
    }

    /// The configuration the index was built with.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The root node id.
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId::new(0)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &BoundingNode {
        &self.nodes[0]
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&BoundingNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[BoundingNode] {
        &self.nodes
    }

    /// Structural statistics.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.nodes.iter().fold(
            IndexStats {
                node_count: self.nodes.len(),
                ..IndexStats::default()
            },
            |mut stats, node| {
                match node.kind {
                    NodeKind::Internal { relaxed, .. } => {
                        stats.internal_count += 1;
                        stats.relaxed_count += usize::from(relaxed);
                    }
                    NodeKind::Carrier { .. } => stats.carrier_count += 1,
                    NodeKind::Sensor { .. } => stats.sensor_count += 1,
                }
                stats.max_depth = stats.max_depth.max(node.depth);
                stats
            },
        )
    }

    /// Sensors reachable below `id`, in tree order.
    #[must_use]
    pub fn sensors_under(&self, id: NodeId) -> Vec<SensorId> {
        let mut sensors = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if let NodeKind::Sensor { sensor } = node.kind {
                sensors.push(sensor);
            }
            stack.extend(node.children().iter().rev());
        }
        sensors
    }

    /// Verify that every node's sphere encloses every sensor sphere below it.
    ///
    /// Returns the worst violation beyond `tolerance`, if any.
    #[must_use]
    pub fn check_enclosure(
        &self,
        geometry: &DetectorGeometry,
        tolerance: f64,
    ) -> Option<EnclosureViolation> {
        let mut worst: Option<EnclosureViolation> = None;
        for (i, node) in self.nodes.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = NodeId::new(i as u32);
            for sensor_id in self.sensors_under(id) {
                let Some(sensor) = geometry.sensor(sensor_id) else {
                    continue;
                };
                let excess = node.sphere.center.distance(sensor.position) + sensor.radius
                    - node.sphere.radius;
                if excess > tolerance && worst.map_or(true, |w| excess > w.excess) {
                    worst = Some(EnclosureViolation {
                        node: id,
                        sensor: sensor_id,
                        excess,
                    });
                }
            }
        }
        worst
    }
}
