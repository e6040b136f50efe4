// src/ingest/registry.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::Source;

pub const ENV_SOURCES_PATH: &str = "SOURCES_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

/// Built-in listing endpoints used when no registry file is present.
pub fn default_sources() -> Vec<Source> {
    vec![
        Source::new("firstledger", "https://firstledger.net/api/tokens"),
        Source::new("xrplto", "https://api.xrpl.to/api/tokens"),
    ]
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Resolve the registry:
/// 1) $SOURCES_PATH (must exist)
/// 2) config/sources.toml
/// 3) built-in defaults
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("SOURCES_PATH points to non-existent path"));
        }
        return load_sources_from(&pb);
    }
    let toml_p = PathBuf::from(DEFAULT_SOURCES_PATH);
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    Ok(default_sources())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let parsed = if hint_ext == "json" || s.trim_start().starts_with('[') {
        parse_json(s)?
    } else {
        parse_toml(s)?
    };
    validate(parsed)
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<Source>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    Ok(serde_json::from_str(s)?)
}

fn validate(items: Vec<Source>) -> Result<Vec<Source>> {
    let mut names = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let name = it.name.trim().to_string();
        let endpoint = it.endpoint.trim().to_string();
        if name.is_empty() {
            bail!("source with empty name ({endpoint})");
        }
        if !names.insert(name.clone()) {
            bail!("duplicate source name '{name}'");
        }
        let url = reqwest::Url::parse(&endpoint)
            .with_context(|| format!("source '{name}': invalid endpoint '{endpoint}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("source '{name}': endpoint must be http(s), got '{}'", url.scheme());
        }
        out.push(Source { name, endpoint });
    }
    if out.is_empty() {
        bail!("no sources configured");
    }
    Ok(out)
}
