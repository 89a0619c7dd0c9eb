//! Bounding-sphere tree nodes.
//!
//! Nodes live in the index arena and refer to their children by [`NodeId`].
//! A node is internal (exactly two children), a carrier leaf (one child per
//! owned sensor) or a sensor terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sensor::{CarrierId, SensorId};
use crate::Sphere;

/// Index of a node in the [`GeometryIndex`](crate::GeometryIndex) arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a node id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the arena slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Two-way split of the covered carriers
    Internal {
        /// The two clusters
        children: [NodeId; 2],
        /// Set when the split was accepted under a relaxed balance bound
        relaxed: bool,
    },
    /// A single carrier, exploded into its sensors
    Carrier {
        /// Carrier covered by this node
        carrier: CarrierId,
        /// One terminal node per owned sensor, in carrier order
        sensors: Vec<NodeId>,
    },
    /// One sensor's own bounding sphere
    Sensor {
        /// Sensor covered by this node
        sensor: SensorId,
    },
}

/// A node in the bounding-sphere hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingNode {
    /// Enclosing sphere of everything below this node
    pub sphere: Sphere,
    /// Depth in the tree (0 = root)
    pub depth: u16,
    /// Number of carriers covered (zero for sensor terminals)
    pub carrier_count: u32,
    /// Node payload
    pub kind: NodeKind,
}

impl BoundingNode {
    /// Check if this node is an internal split.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, NodeKind::Internal { .. })
    }

    /// Check if this node is a sensor terminal.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        matches!(self.kind, NodeKind::Sensor { .. })
    }

    /// Whether this split was accepted under a relaxed balance bound.
    #[must_use]
    pub fn is_relaxed(&self) -> bool {
        matches!(self.kind, NodeKind::Internal { relaxed: true, .. })
    }

    /// Child node ids, in order. Empty for sensor terminals.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Internal { children, .. } => children,
            NodeKind::Carrier { sensors, .. } => sensors,
            NodeKind::Sensor { .. } => &[],
        }
    }
}
