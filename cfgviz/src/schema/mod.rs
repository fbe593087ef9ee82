use serde::{Deserialize, Serialize};

/// A (type label, line template) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaRule {
    #[serde(rename = "type")]
    pub type_label: String,
    pub template: String,
}

impl SchemaRule {
    pub fn new(type_label: impl Into<String>, template: impl Into<String>) -> Self {
        SchemaRule {
            type_label: type_label.into(),
            template: template.into(),
        }
    }
}

/// A rule that discovers entities, with the link rules applied to each of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NodeRule {
    #[serde(rename = "type")]
    pub type_label: String,
    pub template: String,
    #[serde(default, rename = "link")]
    pub links: Vec<SchemaRule>,
}

impl NodeRule {
    pub fn new(type_label: impl Into<String>, template: impl Into<String>) -> Self {
        NodeRule {
            type_label: type_label.into(),
            template: template.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, type_label: impl Into<String>, template: impl Into<String>) -> Self {
        self.links.push(SchemaRule::new(type_label, template));
        self
    }
}

/// The ordered list of node rules driving one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Schema {
    pub nodes: Vec<NodeRule>,
}

impl Schema {
    pub fn new(nodes: Vec<NodeRule>) -> Self {
        Schema { nodes }
    }

    /// Distinct node type labels in order of first appearance.
    pub fn type_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for rule in &self.nodes {
            if !labels.contains(&rule.type_label.as_str()) {
                labels.push(&rule.type_label);
            }
        }
        labels
    }
}

/// How tightly a compiled template is tied to the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    /// The template must cover the whole line.
    #[default]
    Full,
    /// The template must match a prefix of the line.
    Start,
}
