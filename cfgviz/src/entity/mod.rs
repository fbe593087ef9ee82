pub mod link_set;

use std::ops::Range;

use serde::Serialize;

use crate::entity::link_set::LinkSet;

/// A contiguous span of configuration lines recognized as one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// `type_label + " " + name`, unique per type.
    pub id: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub name: String,
    /// The raw lines of the block, header first.
    pub text: Vec<String>,
    /// Half-open index range of `text` within the filtered source.
    pub lines: Range<usize>,
    /// Outgoing references, in first-seen order.
    pub links: LinkSet,
}

impl Entity {
    pub fn new(
        type_label: impl Into<String>,
        name: impl Into<String>,
        text: Vec<String>,
        lines: Range<usize>,
    ) -> Self {
        let type_label = type_label.into();
        let name = name.into();
        Entity {
            id: Entity::id_for(&type_label, &name),
            type_label,
            name,
            text,
            lines,
            links: LinkSet::new(),
        }
    }

    /// Build the identifier an entity of this type and name would carry.
    pub fn id_for(type_label: &str, name: &str) -> String {
        format!("{} {}", type_label, name)
    }

    /// The line that opened the block.
    pub fn header(&self) -> &str {
        self.text.first().map(String::as_str).unwrap_or_default()
    }
}
