use std::fmt::Write as _;

use cfgviz::Graph;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// The graph as pretty-printed JSON, for a renderer.
    Json,
    /// A readable listing of groups, entities and links.
    Summary,
}

pub fn render(graph: &Graph, format: Format) -> anyhow::Result<String> {
    match format {
        Format::Json => {
            let mut out = serde_json::to_string_pretty(graph)?;
            out.push('\n');
            Ok(out)
        }
        Format::Summary => Ok(summary(graph)),
    }
}

fn summary(graph: &Graph) -> String {
    let dangling = graph.dangling_links();
    let mut out = String::new();
    for group in &graph.groups {
        let _ = writeln!(out, "{} ({})", group.type_label, group.entities.len());
        for entity in &group.entities {
            let _ = writeln!(
                out,
                "  {}  [lines {}..{}]",
                entity.id, entity.lines.start, entity.lines.end
            );
            for link in &entity.links {
                let marker = if dangling.contains(&(entity.id.as_str(), link.as_str())) {
                    " (dangling)"
                } else {
                    ""
                };
                let _ = writeln!(out, "    -> {}{}", link, marker);
            }
        }
    }
    out
}
