// src/schema.rs

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use schemars::schema_for;

use crate::{config::StoreConfig, snapshot::StoreSnapshot};

/// Writes the JSON schemas of the snapshot format and of the binary's config
/// into `out_dir`. Returns the written paths.
pub fn write_schema(out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("could not create {}", out_dir.display()))?;

    let snapshot_schema = schema_for!(StoreSnapshot);
    let snapshot_path = out_dir.join("snapshot.schema.json");
    fs::write(&snapshot_path, serde_json::to_string_pretty(&snapshot_schema)?)?;

    let config_schema = schema_for!(StoreConfig);
    let config_path = out_dir.join("config.schema.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config_schema)?)?;

    Ok(vec![snapshot_path, config_path])
}
