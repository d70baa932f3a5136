//! The frozen store and hierarchy pair shared by query and validation sessions.

use crate::hierarchy::TypeHierarchy;
use crate::model::Entity;
use crate::store::GraphStore;

/// An immutable, loaded graph: the store plus its acyclic class hierarchy.
///
/// Only the [`Loader`](crate::load::Loader) constructs one, so holding a `Dataset`
/// guarantees referential integrity and an acyclic hierarchy. It is `Send + Sync`;
/// sessions share it by reference.
#[derive(Debug, Clone)]
pub struct Dataset {
    store: GraphStore,
    hierarchy: TypeHierarchy,
}

impl Dataset {
    pub(crate) fn new(store: GraphStore, hierarchy: TypeHierarchy) -> Self {
        Self { store, hierarchy }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Whether the entity is an instance of `class` or of any subclass of it.
    /// False for unknown entities.
    pub fn is_instance_of(&self, entity: &str, class: &str) -> bool {
        self.store
            .entity(entity)
            .is_some_and(|e| self.hierarchy.is_instance_of(&e.classes, class))
    }

    /// Entities that are (possibly inferred) instances of `class`, in identifier order.
    pub fn instances_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.store
            .entities()
            .filter(move |e| self.hierarchy.is_instance_of(&e.classes, class))
    }
}
