//! Identity commands.

use clap::Args;
use serde_json::json;

use super::{find_identity, open_db, output_result};
use crate::Cli;

#[derive(Args)]
pub struct ListCommand {
    /// Include soft-deleted identities
    #[arg(short = 'a', long)]
    all: bool,

    /// Only members of this group
    #[arg(short = 'g', long)]
    group: Option<String>,
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let identities = match &self.group {
            Some(group) => db.list_identities_by_group(group)?,
            None => db.list_identities(self.all)?,
        };
        output_result(&identities, cli.json)
    }
}

#[derive(Args)]
pub struct ShowCommand {
    /// Identity id or name
    identity: String,

    /// Number of recent detections to include
    #[arg(short = 'n', long, default_value_t = 10)]
    recent: usize,
}

impl ShowCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let identity = find_identity(&db, &self.identity)?;

        let encodings: Vec<_> = db
            .get_encodings(identity.id)?
            .into_iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "len": e.vector.len(),
                    "quality_score": e.quality_score,
                    "is_active": e.is_active,
                    "created_at": e.created_at,
                })
            })
            .collect();
        let images: Vec<_> = db
            .reference_images(identity.id)?
            .into_iter()
            .map(|img| {
                json!({
                    "id": img.id,
                    "image_type": img.image_type,
                    "bytes": img.data.len(),
                    "metadata": img.metadata,
                    "created_at": img.created_at,
                })
            })
            .collect();

        let out = json!({
            "identity": identity,
            "encodings": encodings,
            "reference_images": images,
            "stats": db.detection_stats(identity.id)?,
            "recent_detections": db.recent_detections(identity.id, self.recent)?,
        });
        output_result(&out, cli.json)
    }
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Identity id or name
    identity: String,
}

impl DeleteCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let identity = find_identity(&db, &self.identity)?;
        db.soft_delete(identity.id)?;
        eprintln!("Deleted identity {} ({})", identity.id, identity.name);
        Ok(())
    }
}
