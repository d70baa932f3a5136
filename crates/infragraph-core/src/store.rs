//! Frozen graph store: entities, attributes, and indexed relationships.
//!
//! The store is populated by the [`Loader`](crate::load::Loader) and exposes only
//! read access afterwards. Forward and inverse edge lookups both go through
//! predicate-keyed indexes, so `relationships_to` costs the same as `relationships_from`.

use crate::model::{Entity, Relationship, Value};
use std::collections::{BTreeMap, HashMap};

/// Edge indices for one node, overall and per predicate. Indices keep insertion order.
#[derive(Debug, Clone, Default)]
struct EdgeIndex {
    all: Vec<usize>,
    by_predicate: HashMap<String, Vec<usize>>,
}

impl EdgeIndex {
    fn push(&mut self, predicate: &str, edge: usize) {
        self.all.push(edge);
        self.by_predicate
            .entry(predicate.to_string())
            .or_default()
            .push(edge);
    }

    fn lookup(&self, predicate: Option<&str>) -> &[usize] {
        match predicate {
            None => &self.all,
            Some(p) => self.by_predicate.get(p).map_or(&[], Vec::as_slice),
        }
    }
}

/// Outcome of [`GraphStore::insert_attribute`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AttributeInsert {
    Inserted,
    /// The attribute already had this value; the new one was not stored.
    Duplicate(Value),
    MissingSubject,
}

/// Entities keyed by identifier plus relationship indexes.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    entities: BTreeMap<String, Entity>,
    relationships: Vec<Relationship>,
    /// Subject → outgoing edge indices.
    outgoing: HashMap<String, EdgeIndex>,
    /// Object → incoming edge indices (the inverse-traversal index).
    incoming: HashMap<String, EdgeIndex>,
    /// Predicate → edge indices.
    by_predicate: HashMap<String, Vec<usize>>,
    /// Attribute name → subjects carrying it, in identifier order.
    attribute_index: HashMap<String, Vec<String>>,
    /// Asserted class → entities declaring it, in identifier order.
    class_index: HashMap<String, Vec<String>>,
}

impl GraphStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert or merge an entity declaration. Classes are deduplicated.
    pub(crate) fn insert_entity(&mut self, id: &str, classes: &[String]) {
        let entity = self
            .entities
            .entry(id.to_string())
            .or_insert_with(|| Entity::new(id));
        for class in classes {
            if !entity.classes.contains(class) {
                entity.classes.push(class.clone());
            }
        }
    }

    /// Set an attribute on a declared entity. An existing value is never overwritten.
    pub(crate) fn insert_attribute(
        &mut self,
        subject: &str,
        name: &str,
        value: Value,
    ) -> AttributeInsert {
        let Some(entity) = self.entities.get_mut(subject) else {
            return AttributeInsert::MissingSubject;
        };
        if let Some(existing) = entity.attributes.get(name) {
            return AttributeInsert::Duplicate(existing.clone());
        }
        entity.attributes.insert(name.to_string(), value);
        AttributeInsert::Inserted
    }

    pub(crate) fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Rebuild all lookup indexes from the entity map and relationship list.
    /// Called once when the load finishes.
    pub(crate) fn rebuild_indexes(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        self.by_predicate.clear();
        self.attribute_index.clear();
        self.class_index.clear();

        for (i, rel) in self.relationships.iter().enumerate() {
            self.outgoing
                .entry(rel.subject.clone())
                .or_default()
                .push(&rel.predicate, i);
            self.incoming
                .entry(rel.object.clone())
                .or_default()
                .push(&rel.predicate, i);
            self.by_predicate
                .entry(rel.predicate.clone())
                .or_default()
                .push(i);
        }

        for (id, entity) in &self.entities {
            for class in &entity.classes {
                self.class_index
                    .entry(class.clone())
                    .or_default()
                    .push(id.clone());
            }
            for name in entity.attributes.keys() {
                self.attribute_index
                    .entry(name.clone())
                    .or_default()
                    .push(id.clone());
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// All entities in sorted identifier order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities asserting `class` directly (no inference), in identifier order.
    pub fn entities_with_class<'a>(
        &'a self,
        class: &str,
    ) -> impl Iterator<Item = &'a Entity> + use<'a> {
        self.class_index
            .get(class)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
    }

    pub fn attributes_of(&self, id: &str) -> Option<&BTreeMap<String, Value>> {
        self.entities.get(id).map(|e| &e.attributes)
    }

    pub fn attribute(&self, id: &str, name: &str) -> Option<&Value> {
        self.entities.get(id).and_then(|e| e.attributes.get(name))
    }

    /// Subjects carrying attribute `name`, in identifier order. With `value`, only
    /// subjects whose attribute equals it.
    pub fn subjects_with_attribute<'a>(
        &'a self,
        name: &'a str,
        value: Option<&'a Value>,
    ) -> impl Iterator<Item = &'a str> + use<'a> {
        self.attribute_index
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(move |id| value.is_none_or(|v| self.attribute(id, name) == Some(v)))
    }

    /// Outgoing edges of `id`, optionally restricted to one predicate.
    pub fn relationships_from<'a>(
        &'a self,
        id: &str,
        predicate: Option<&str>,
    ) -> impl Iterator<Item = &'a Relationship> + use<'a> {
        let indices = self.outgoing.get(id).map_or(&[][..], |idx| idx.lookup(predicate));
        self.resolve(indices)
    }

    /// Incoming edges of `id` (inverse lookup), optionally restricted to one predicate.
    pub fn relationships_to<'a>(
        &'a self,
        id: &str,
        predicate: Option<&str>,
    ) -> impl Iterator<Item = &'a Relationship> + use<'a> {
        let indices = self.incoming.get(id).map_or(&[][..], |idx| idx.lookup(predicate));
        self.resolve(indices)
    }

    /// All edges labeled `predicate`, in insertion order.
    pub fn relationships_with<'a>(
        &'a self,
        predicate: &str,
    ) -> impl Iterator<Item = &'a Relationship> + use<'a> {
        let indices = self.by_predicate.get(predicate).map_or(&[][..], Vec::as_slice);
        self.resolve(indices)
    }

    /// All edges in insertion order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    fn resolve<'a>(
        &'a self,
        indices: &'a [usize],
    ) -> impl Iterator<Item = &'a Relationship> + use<'a> {
        indices.iter().filter_map(|&i| self.relationships.get(i))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.entities.values().map(|e| e.attributes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GraphStore {
        let mut s = GraphStore::new();
        s.insert_entity("app1", &["Application".to_string()]);
        s.insert_entity("vm1", &["VirtualMachine".to_string()]);
        s.insert_entity("vm2", &["VirtualMachine".to_string()]);
        s.push_relationship(Relationship::new("app1", "hosted_on", "vm1"));
        s.push_relationship(Relationship::new("app1", "uses", "vm2"));
        s.push_relationship(Relationship::new("app1", "hosted_on", "vm2"));
        s.rebuild_indexes();
        s
    }

    #[test]
    fn test_forward_lookup_by_predicate() {
        let s = store();
        let objects: Vec<&str> = s
            .relationships_from("app1", Some("hosted_on"))
            .map(|r| r.object.as_str())
            .collect();
        assert_eq!(objects, vec!["vm1", "vm2"]);
    }

    #[test]
    fn test_forward_lookup_all_keeps_insertion_order() {
        let s = store();
        let preds: Vec<&str> = s
            .relationships_from("app1", None)
            .map(|r| r.predicate.as_str())
            .collect();
        assert_eq!(preds, vec!["hosted_on", "uses", "hosted_on"]);
    }

    #[test]
    fn test_inverse_lookup() {
        let s = store();
        let subjects: Vec<&str> = s
            .relationships_to("vm2", Some("uses"))
            .map(|r| r.subject.as_str())
            .collect();
        assert_eq!(subjects, vec!["app1"]);
        assert_eq!(s.relationships_to("vm2", None).count(), 2);
        assert_eq!(s.relationships_to("app1", None).count(), 0);
    }

    #[test]
    fn test_unknown_node_and_predicate() {
        let s = store();
        assert_eq!(s.relationships_from("nope", None).count(), 0);
        assert_eq!(s.relationships_from("app1", Some("nope")).count(), 0);
        assert_eq!(s.relationships_with("nope").count(), 0);
    }

    #[test]
    fn test_by_predicate_index() {
        let s = store();
        assert_eq!(s.relationships_with("hosted_on").count(), 2);
    }

    #[test]
    fn test_attribute_first_value_kept() {
        let mut s = store();
        assert_eq!(
            s.insert_attribute("vm1", "name", "VM 1".into()),
            AttributeInsert::Inserted
        );
        assert_eq!(
            s.insert_attribute("vm1", "name", "other".into()),
            AttributeInsert::Duplicate(Value::from("VM 1"))
        );
        assert_eq!(
            s.insert_attribute("ghost", "name", "x".into()),
            AttributeInsert::MissingSubject
        );
        s.rebuild_indexes();
        assert_eq!(s.attribute("vm1", "name"), Some(&Value::from("VM 1")));
        assert_eq!(
            s.subjects_with_attribute("name", None).collect::<Vec<_>>(),
            vec!["vm1"]
        );
        let wanted = Value::from("VM 1");
        assert_eq!(s.subjects_with_attribute("name", Some(&wanted)).count(), 1);
        let other = Value::from("other");
        assert_eq!(s.subjects_with_attribute("name", Some(&other)).count(), 0);
    }

    #[test]
    fn test_class_index_is_asserted_only() {
        let s = store();
        let ids: Vec<&str> = s
            .entities_with_class("VirtualMachine")
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["vm1", "vm2"]);
        assert_eq!(s.entities_with_class("Compute").count(), 0);
    }

    #[test]
    fn test_entity_merge_dedupes_classes() {
        let mut s = GraphStore::new();
        s.insert_entity("db1", &["Database".to_string()]);
        s.insert_entity("db1", &["Database".to_string(), "Asset".to_string()]);
        assert_eq!(s.entity("db1").unwrap().classes, vec!["Database", "Asset"]);
    }
}
