use std::collections::HashMap;
use std::sync::Arc;

use cfgviz::schema::{Anchor, Schema, SchemaRule};
use cfgviz::template::Pattern;
use cfgviz::template::error::RuleError;
use cfgviz::{Error, Result};
use tracing::info;

/// A node rule with its header pattern and the link patterns applied to its entities.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub pattern: Pattern,
    pub links: Vec<Arc<Pattern>>,
}

/// Every template of a schema, compiled once before any line is scanned.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    rules: Vec<CompiledRule>,
    type_labels: Vec<String>,
}

impl CompiledSchema {
    /// Compile all templates, reporting every malformed one rather than just the first.
    pub fn compile(schema: &Schema, anchor: Anchor) -> Result<Self> {
        let mut errors = Vec::new();
        let mut rules = Vec::new();
        // Identical link rules shared by several node rules compile once.
        let mut link_cache: HashMap<&SchemaRule, Arc<Pattern>> = HashMap::new();

        for (i, node) in schema.nodes.iter().enumerate() {
            let pattern = match Pattern::compile(&node.type_label, &node.template, anchor) {
                Ok(pattern) => Some(pattern),
                Err(error) => {
                    errors.push(RuleError {
                        origin: format!("node[{}]", i),
                        template: node.template.clone(),
                        error,
                    });
                    None
                }
            };

            let mut links = Vec::new();
            for (j, link) in node.links.iter().enumerate() {
                if let Some(cached) = link_cache.get(link) {
                    links.push(Arc::clone(cached));
                    continue;
                }
                match Pattern::from_rule(link, anchor) {
                    Ok(compiled) => {
                        let compiled = Arc::new(compiled);
                        link_cache.insert(link, Arc::clone(&compiled));
                        links.push(compiled);
                    }
                    Err(error) => errors.push(RuleError {
                        origin: format!("node[{}].link[{}]", i, j),
                        template: link.template.clone(),
                        error,
                    }),
                }
            }

            if let Some(pattern) = pattern {
                rules.push(CompiledRule { pattern, links });
            }
        }

        if !errors.is_empty() {
            return Err(Error::SchemaCompile(errors));
        }

        info!(
            rules = rules.len(),
            link_patterns = link_cache.len(),
            "compiled schema"
        );
        Ok(CompiledSchema {
            rules,
            type_labels: schema
                .type_labels()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Distinct node type labels in schema order.
    pub fn type_labels(&self) -> &[String] {
        &self.type_labels
    }
}
