pub mod entity;
pub mod error;
pub mod schema;
pub mod segment;
pub mod source;
pub mod template;

pub use error::{Error, Result};

use serde::Serialize;

use crate::entity::Entity;

/// The extracted graph, grouped by entity type for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub groups: Vec<EntityGroup>,
}

/// All entities sharing one type label, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityGroup {
    #[serde(rename = "type")]
    pub type_label: String,
    pub entities: Vec<Entity>,
}

impl Graph {
    /// Create a graph with one empty group per distinct label, in the given order.
    pub fn with_groups<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Graph::default();
        for label in labels {
            let label = label.into();
            if graph.group(&label).is_none() {
                graph.groups.push(EntityGroup {
                    type_label: label,
                    entities: Vec::new(),
                });
            }
        }
        graph
    }

    pub fn group(&self, type_label: &str) -> Option<&EntityGroup> {
        self.groups.iter().find(|g| g.type_label == type_label)
    }

    /// Append an entity to its type's group, creating the group if needed.
    pub fn push(&mut self, entity: Entity) {
        match self
            .groups
            .iter_mut()
            .find(|g| g.type_label == entity.type_label)
        {
            Some(group) => group.entities.push(entity),
            None => self.groups.push(EntityGroup {
                type_label: entity.type_label.clone(),
                entities: vec![entity],
            }),
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.groups.iter().flat_map(|g| g.entities.iter())
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entities.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Links whose target id names no entity in the graph, as (from, to) pairs.
    pub fn dangling_links(&self) -> Vec<(&str, &str)> {
        self.entities()
            .flat_map(|e| e.links.iter().map(move |link| (e.id.as_str(), link)))
            .filter(|(_, link)| self.entity(link).is_none())
            .collect()
    }
}
