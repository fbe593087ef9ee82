use cfgviz::entity::Entity;
use cfgviz::segment::{ScanLimits, Segmenter};
use cfgviz::source::SourceLines;
use cfgviz::{Graph, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::reference;
use crate::schema::{CompiledRule, CompiledSchema};

/// Runs a compiled schema over a configuration and assembles the graph.
pub struct Extractor<'s> {
    schema: &'s CompiledSchema,
    limits: ScanLimits,
    parallel: bool,
}

impl<'s> Extractor<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Extractor {
            schema,
            limits: ScanLimits::default(),
            parallel: false,
        }
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Spread rules and entities over the rayon pool. Output is identical to a sequential run.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(&self, source: &SourceLines) -> Result<Graph> {
        self.limits.check_lines(source.len())?;
        let lines = source.lines();
        info!(
            lines = lines.len(),
            rules = self.schema.rules().len(),
            parallel = self.parallel,
            "parsing config for nodes"
        );

        let per_rule: Vec<Vec<Entity>> = if self.parallel {
            self.schema
                .rules()
                .par_iter()
                .map(|rule| self.scan_rule(rule, lines))
                .collect::<Result<_>>()?
        } else {
            self.schema
                .rules()
                .iter()
                .map(|rule| self.scan_rule(rule, lines))
                .collect::<Result<_>>()?
        };

        let total: usize = per_rule.iter().map(Vec::len).sum();
        self.limits.check_entities(total)?;

        let mut graph = Graph::with_groups(self.schema.type_labels());
        for entity in per_rule.into_iter().flatten() {
            graph.push(entity);
        }

        let links: usize = graph.entities().map(|e| e.links.len()).sum();
        info!(entities = total, links, "collected links between entities");
        Ok(graph)
    }

    /// Segment the source for one rule and resolve its entities' references.
    fn scan_rule(&self, rule: &CompiledRule, lines: &[String]) -> Result<Vec<Entity>> {
        let mut entities = Segmenter::new(&rule.pattern)
            .with_limit(self.limits.max_entities)
            .run(lines)?;

        if self.parallel {
            entities
                .par_iter_mut()
                .for_each(|entity| {
                    reference::extract(entity, &rule.links);
                });
        } else {
            for entity in &mut entities {
                reference::extract(entity, &rule.links);
            }
        }

        debug!(
            type_label = rule.pattern.type_label(),
            template = rule.pattern.template(),
            entities = entities.len(),
            "parsed nodes"
        );
        Ok(entities)
    }
}

/// Sequential extraction without limits.
pub fn extract_graph(source: &SourceLines, schema: &CompiledSchema) -> Result<Graph> {
    Extractor::new(schema).run(source)
}
