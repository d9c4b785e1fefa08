//! Utility functions for CLI commands.

use anyhow::Context as _;
use tracing::debug;
use visage_facedb::{FaceDb, Identity};
use visage_faceid::Config;

use crate::Cli;

/// Resolves the configuration: file, then environment, then `--db`.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    let cfg = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    Ok(cfg.from_env().with_db_path_override(cli.db.clone()))
}

/// Opens the database. Nothing works without it, so errors are final.
pub fn open_db(cli: &Cli) -> anyhow::Result<FaceDb> {
    let cfg = get_config(cli)?;
    debug!(path = %cfg.db_path.display(), dim = cfg.dim, "opening database");
    cfg.open_db()
        .with_context(|| format!("open database {}", cfg.db_path.display()))
}

/// Resolves an identity given as a numeric id or an active name.
pub fn find_identity(db: &FaceDb, key: &str) -> anyhow::Result<Identity> {
    let found = match key.parse::<u64>() {
        Ok(id) => db.get_identity(id)?,
        Err(_) => db.get_identity_by_name(key)?,
    };
    found.ok_or_else(|| anyhow::anyhow!("identity '{}' not found", key))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}
