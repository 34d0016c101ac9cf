//! Entity identity and classification.
//!
//! Entities are identified by a normalized string key (case- and
//! whitespace-insensitive, Unicode NFC) while keeping the original-case
//! display value. The [`EntityRegistry`] provides O(1) lookups in both
//! directions via `DashMap` and derives each entity's kind from the triples
//! it participates in — kind is never stored independently.

use dashmap::DashMap;
use unicode_normalization::UnicodeNormalization;

use crate::triple::{Predicate, Triple};

/// Predicates whose subjects define hub ("main community") entities.
pub const HUB_PREDICATES: &[&str] = &["HAS_MAIN_COMMUNITY"];

/// Normalized, case/whitespace-insensitive entity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Normalize a display name into its key: NFC, trimmed, lowercased,
    /// inner whitespace runs collapsed to single spaces.
    pub fn new(display: &str) -> Self {
        let nfc: String = display.nfc().collect();
        let key = nfc
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        EntityId(key)
    }

    /// The normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of an entity in the community graph.
///
/// Derived, not stored: an entity that appears as the subject of a hub
/// predicate is a `MainCommunity`; every other entity is a `Community`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Predicate-defining hub entity.
    MainCommunity,
    /// Leaf value (community or attribute).
    Community,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::MainCommunity => write!(f, "Main_Community"),
            EntityKind::Community => write!(f, "Community"),
        }
    }
}

/// An entity with its derived kind and display value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub display: String,
    pub kind: EntityKind,
}

/// Registry of all entities observed in a triple set.
///
/// Built once per snapshot, read-only thereafter. First-seen display casing
/// wins so that repeated loads over the same data are deterministic.
pub struct EntityRegistry {
    entities: DashMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Build the registry from a triple set.
    ///
    /// Every subject and object resolves to exactly one entity; subjects of
    /// hub predicates are promoted to `MainCommunity` even when first seen
    /// elsewhere as a plain value.
    pub fn from_triples(triples: &[Triple]) -> Self {
        let registry = Self {
            entities: DashMap::new(),
        };
        let hubs: Vec<Predicate> = HUB_PREDICATES.iter().map(|p| Predicate::new(p)).collect();

        for triple in triples {
            let subject_is_hub = hubs.contains(&triple.predicate);
            registry.observe(&triple.subject, subject_is_hub);
            registry.observe(&triple.object, false);
        }
        registry
    }

    fn observe(&self, display: &str, is_hub_subject: bool) {
        let display = display.trim();
        if display.is_empty() {
            return;
        }
        let id = EntityId::new(display);
        match self.entities.get_mut(&id) {
            Some(mut entry) => {
                if is_hub_subject {
                    entry.kind = EntityKind::MainCommunity;
                }
            }
            None => {
                self.entities.insert(
                    id.clone(),
                    Entity {
                        id,
                        display: display.to_string(),
                        kind: if is_hub_subject {
                            EntityKind::MainCommunity
                        } else {
                            EntityKind::Community
                        },
                    },
                );
            }
        }
    }

    /// Look up an entity by display name or key (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.entities.get(&EntityId::new(name)).map(|e| e.clone())
    }

    /// The derived kind for a name, if the entity exists.
    pub fn kind_of(&self, name: &str) -> Option<EntityKind> {
        self.get(name).map(|e| e.kind)
    }

    /// Resolve a key back to its display form, falling back to the key.
    pub fn display_of(&self, id: &EntityId) -> String {
        self.entities
            .get(id)
            .map(|e| e.display.clone())
            .unwrap_or_else(|| id.as_str().to_string())
    }

    /// All entities, unordered.
    pub fn all(&self) -> Vec<Entity> {
        self.entities.iter().map(|e| e.value().clone()).collect()
    }

    /// Number of distinct entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Count entities per kind: (main communities, communities).
    pub fn kind_counts(&self) -> (usize, usize) {
        let mut main = 0;
        let mut plain = 0;
        for entry in self.entities.iter() {
            match entry.value().kind {
                EntityKind::MainCommunity => main += 1,
                EntityKind::Community => plain += 1,
            }
        }
        (main, plain)
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_normalization() {
        assert_eq!(EntityId::new("Rock Climbing"), EntityId::new("rock climbing"));
        assert_eq!(EntityId::new("  Rock   Climbing "), EntityId::new("Rock Climbing"));
        assert_ne!(EntityId::new("Rock Climbing"), EntityId::new("Rock"));
    }

    #[test]
    fn first_seen_display_wins() {
        let triples = vec![
            Triple::new("Surfing", "ALSO_INVOLVED_IN", "Yoga"),
            Triple::new("SURFING", "ASSOCIATED_WITH", "Diving"),
        ];
        let reg = EntityRegistry::from_triples(&triples);
        assert_eq!(reg.get("surfing").unwrap().display, "Surfing");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn hub_subject_is_main_community() {
        let triples = vec![
            Triple::new("Surfing", "HAS_MAIN_COMMUNITY", "SurfBreak"),
            Triple::new("Surfing", "ALSO_INVOLVED_IN", "Yoga"),
        ];
        let reg = EntityRegistry::from_triples(&triples);
        assert_eq!(reg.kind_of("Surfing"), Some(EntityKind::MainCommunity));
        assert_eq!(reg.kind_of("SurfBreak"), Some(EntityKind::Community));
        assert_eq!(reg.kind_of("Yoga"), Some(EntityKind::Community));
    }

    #[test]
    fn hub_promotion_is_order_independent() {
        // Seen first as an object, later as a hub subject.
        let triples = vec![
            Triple::new("Yoga", "ALSO_INVOLVED_IN", "Surfing"),
            Triple::new("Surfing", "HAS_MAIN_COMMUNITY", "SurfBreak"),
        ];
        let reg = EntityRegistry::from_triples(&triples);
        assert_eq!(reg.kind_of("Surfing"), Some(EntityKind::MainCommunity));
    }

    #[test]
    fn every_participant_resolves_to_one_kind() {
        let triples = vec![
            Triple::new("Alice", "LIVES_IN", "Honolulu"),
            Triple::new("Alice", "ALSO_INVOLVED_IN", "Surfing"),
        ];
        let reg = EntityRegistry::from_triples(&triples);
        for name in ["Alice", "Honolulu", "Surfing"] {
            assert!(reg.kind_of(name).is_some(), "{name} should resolve");
        }
        let (main, plain) = reg.kind_counts();
        assert_eq!(main, 0);
        assert_eq!(plain, 3);
    }

    #[test]
    fn blank_names_are_skipped() {
        let triples = vec![Triple::new("  ", "LIVES_IN", "Honolulu")];
        let reg = EntityRegistry::from_triples(&triples);
        assert_eq!(reg.len(), 1);
    }
}
