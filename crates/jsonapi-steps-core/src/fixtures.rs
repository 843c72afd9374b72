// crates/jsonapi-steps-core/src/fixtures.rs
// ============================================================================
// Module: Fixtures
// Description: Fixture entities, the circular reference graph, and gateways.
// Purpose: Describe scenario setup data and how it is persisted.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Scenarios create one of three fixture kinds. [`FixtureEntity`] values are
//! queued on a [`FixtureGateway`] with `persist` and written by `flush`; the
//! assertion helper flushes after every fixture so each step is durable
//! before the next one runs.
//!
//! The circular reference fixture is a cyclic graph: node A is its own parent
//! and node B's parent is A, and A's children are A and B. Nodes live in a
//! [`FixtureGraph`] arena and point at each other through [`EntityKey`]
//! indices, so the cycle needs no shared ownership.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name given to related dummy fixtures.
pub const RELATED_DUMMY_NAME: &str = "RelatedDummy with no friends";
/// Name given to dummy friend fixtures.
pub const DUMMY_FRIEND_NAME: &str = "DummyFriend";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fixture construction and persistence errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixtureError {
    /// A graph key does not belong to the graph.
    #[error("unknown fixture graph key {0}")]
    UnknownKey(usize),
    /// The persistence backend failed.
    #[error("fixture store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Fixture kinds a scenario can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FixtureKind {
    /// A related dummy without friends.
    RelatedDummy,
    /// A dummy friend.
    DummyFriend,
    /// A self and mutually referencing pair.
    CircularReference,
}

impl FixtureKind {
    /// All fixture kinds in declaration order.
    pub const ALL: [Self; 3] = [Self::RelatedDummy, Self::DummyFriend, Self::CircularReference];

    /// Returns the scenario label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RelatedDummy => "RelatedDummy",
            Self::DummyFriend => "DummyFriend",
            Self::CircularReference => "CircularReference",
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Entities
// ============================================================================

/// Related dummy record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedDummy {
    /// Display name.
    pub name: String,
}

/// Dummy friend record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyFriend {
    /// Display name.
    pub name: String,
}

/// Index of a node inside a [`FixtureGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey(usize);

impl EntityKey {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Circular reference node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularReferenceNode {
    /// Parent node, possibly the node itself.
    pub parent: Option<EntityKey>,
    /// Child nodes in insertion order, possibly including the node itself.
    pub children: Vec<EntityKey>,
}

/// Arena of circular reference nodes.
///
/// # Invariants
/// - Every key stored in a node refers to a node of the same graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureGraph {
    /// Nodes indexed by [`EntityKey`].
    nodes: Vec<CircularReferenceNode>,
}

impl FixtureGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
        }
    }

    /// Builds the circular reference fixture graph.
    ///
    /// A is its own parent, B's parent is A, and A's children are A then B.
    #[must_use]
    pub fn circular_reference() -> Self {
        let first = EntityKey(0);
        let second = EntityKey(1);
        Self {
            nodes: vec![
                CircularReferenceNode {
                    parent: Some(first),
                    children: vec![first, second],
                },
                CircularReferenceNode {
                    parent: Some(first),
                    children: Vec::new(),
                },
            ],
        }
    }

    /// Adds a detached node.
    pub fn add_node(&mut self) -> EntityKey {
        self.nodes.push(CircularReferenceNode::default());
        EntityKey(self.nodes.len() - 1)
    }

    /// Sets the parent of `child`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownKey`] when either key is foreign.
    pub fn set_parent(&mut self, child: EntityKey, parent: EntityKey) -> Result<(), FixtureError> {
        self.check(parent)?;
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Appends `child` to the children of `parent`; duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::UnknownKey`] when either key is foreign.
    pub fn add_child(&mut self, parent: EntityKey, child: EntityKey) -> Result<(), FixtureError> {
        self.check(child)?;
        let node = self.node_mut(parent)?;
        if !node.children.contains(&child) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Returns the node for `key`.
    #[must_use]
    pub fn node(&self, key: EntityKey) -> Option<&CircularReferenceNode> {
        self.nodes.get(key.0)
    }

    /// Iterates nodes with their keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &CircularReferenceNode)> {
        self.nodes.iter().enumerate().map(|(idx, node)| (EntityKey(idx), node))
    }

    /// Returns the node count.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the graph has no nodes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fails when `key` is not part of the graph.
    const fn check(&self, key: EntityKey) -> Result<(), FixtureError> {
        if key.0 < self.nodes.len() { Ok(()) } else { Err(FixtureError::UnknownKey(key.0)) }
    }

    /// Returns a mutable node for `key`.
    fn node_mut(&mut self, key: EntityKey) -> Result<&mut CircularReferenceNode, FixtureError> {
        self.nodes.get_mut(key.0).ok_or(FixtureError::UnknownKey(key.0))
    }
}

/// Entity queued on a fixture gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixtureEntity {
    /// Related dummy record.
    RelatedDummy(RelatedDummy),
    /// Dummy friend record.
    DummyFriend(DummyFriend),
    /// Circular reference nodes; each node is persisted as its own entity.
    CircularReference(FixtureGraph),
}

impl FixtureEntity {
    /// Builds the fixture for a scenario kind.
    #[must_use]
    pub fn for_kind(kind: FixtureKind) -> Self {
        match kind {
            FixtureKind::RelatedDummy => Self::RelatedDummy(RelatedDummy {
                name: RELATED_DUMMY_NAME.to_string(),
            }),
            FixtureKind::DummyFriend => Self::DummyFriend(DummyFriend {
                name: DUMMY_FRIEND_NAME.to_string(),
            }),
            FixtureKind::CircularReference => {
                Self::CircularReference(FixtureGraph::circular_reference())
            }
        }
    }

    /// Returns the entity kind.
    #[must_use]
    pub const fn kind(&self) -> FixtureKind {
        match self {
            Self::RelatedDummy(_) => FixtureKind::RelatedDummy,
            Self::DummyFriend(_) => FixtureKind::DummyFriend,
            Self::CircularReference(_) => FixtureKind::CircularReference,
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Identifier assigned to a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntity {
    /// Entity kind.
    pub kind: FixtureKind,
    /// Store-assigned identifier.
    pub id: i64,
}

/// Entities written by one flush, in persist order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    /// Persisted entities; graph nodes appear in key order.
    pub entities: Vec<PersistedEntity>,
}

impl FlushReport {
    /// Returns identifiers of the given kind.
    #[must_use]
    pub fn ids(&self, kind: FixtureKind) -> Vec<i64> {
        self.entities.iter().filter(|entity| entity.kind == kind).map(|entity| entity.id).collect()
    }
}

/// Unit-of-work persistence for fixtures.
pub trait FixtureGateway {
    /// Queues an entity for the next flush.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the entity cannot be queued.
    fn persist(&mut self, entity: FixtureEntity) -> Result<(), FixtureError>;

    /// Writes all queued entities atomically.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the write fails; nothing is persisted.
    fn flush(&mut self) -> Result<FlushReport, FixtureError>;
}

/// Stored circular reference row, with links as assigned identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCircularReference {
    /// Assigned identifier.
    pub id: i64,
    /// Parent identifier.
    pub parent_id: Option<i64>,
    /// Child identifiers in insertion order.
    pub children: Vec<i64>,
}

/// In-memory fixture gateway for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFixtureGateway {
    /// Entities queued since the last flush.
    pending: Vec<FixtureEntity>,
    /// Flushed related dummies by id.
    related_dummies: Vec<(i64, RelatedDummy)>,
    /// Flushed dummy friends by id.
    dummy_friends: Vec<(i64, DummyFriend)>,
    /// Flushed circular references.
    circular_references: Vec<StoredCircularReference>,
    /// Last assigned identifier.
    last_id: i64,
    /// Number of completed flushes.
    flushes: usize,
}

impl InMemoryFixtureGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entities waiting for a flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns the number of completed flushes.
    #[must_use]
    pub const fn flushes(&self) -> usize {
        self.flushes
    }

    /// Returns flushed related dummies.
    #[must_use]
    pub fn related_dummies(&self) -> &[(i64, RelatedDummy)] {
        &self.related_dummies
    }

    /// Returns flushed dummy friends.
    #[must_use]
    pub fn dummy_friends(&self) -> &[(i64, DummyFriend)] {
        &self.dummy_friends
    }

    /// Returns flushed circular references.
    #[must_use]
    pub fn circular_references(&self) -> &[StoredCircularReference] {
        &self.circular_references
    }

    /// Returns the next identifier.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl FixtureGateway for InMemoryFixtureGateway {
    fn persist(&mut self, entity: FixtureEntity) -> Result<(), FixtureError> {
        self.pending.push(entity);
        Ok(())
    }

    fn flush(&mut self) -> Result<FlushReport, FixtureError> {
        let mut staged = self.clone();
        let mut report = FlushReport::default();
        for entity in std::mem::take(&mut staged.pending) {
            match entity {
                FixtureEntity::RelatedDummy(dummy) => {
                    let id = staged.next_id();
                    staged.related_dummies.push((id, dummy));
                    report.entities.push(PersistedEntity {
                        kind: FixtureKind::RelatedDummy,
                        id,
                    });
                }
                FixtureEntity::DummyFriend(friend) => {
                    let id = staged.next_id();
                    staged.dummy_friends.push((id, friend));
                    report.entities.push(PersistedEntity {
                        kind: FixtureKind::DummyFriend,
                        id,
                    });
                }
                FixtureEntity::CircularReference(graph) => {
                    let ids: Vec<i64> = graph.iter().map(|_| staged.next_id()).collect();
                    let resolve = |key: EntityKey| {
                        ids.get(key.index()).copied().ok_or(FixtureError::UnknownKey(key.index()))
                    };
                    for (key, node) in graph.iter() {
                        let id = resolve(key)?;
                        let parent_id = node.parent.map(resolve).transpose()?;
                        let mut children = Vec::with_capacity(node.children.len());
                        for child in &node.children {
                            children.push(resolve(*child)?);
                        }
                        staged.circular_references.push(StoredCircularReference {
                            id,
                            parent_id,
                            children,
                        });
                        report.entities.push(PersistedEntity {
                            kind: FixtureKind::CircularReference,
                            id,
                        });
                    }
                }
            }
        }
        staged.flushes += 1;
        *self = staged;
        Ok(report)
    }
}
