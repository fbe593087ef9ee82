use std::path::Path;

use anyhow::Context;
use cfgviz::schema::{Anchor, Schema};
use cfgviz::segment::ScanLimits;
use cfgviz::source::LineFilter;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_FILE: &str = "cfgviz.toml";

/// Everything a run needs besides the configuration dump itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Line anchoring for every template.
    #[serde(default)]
    pub anchor: Anchor,

    #[serde(default)]
    pub filter: LineFilter,

    #[serde(default)]
    pub limits: ScanLimits,

    /// Node rules, in scan order. Written as `[[node]]` tables.
    #[serde(default, rename = "node")]
    pub schema: Schema,
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        tracing::info!("reading settings file \"{}\"", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings file '{}'", path.display()))?;
        Settings::parse(&text).with_context(|| format!("invalid settings file '{}'", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
