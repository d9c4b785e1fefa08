//! Groups, stats and integrity checks.

use clap::Args;
use serde_json::json;

use super::{find_identity, open_db, output_result};
use crate::Cli;

#[derive(Args)]
pub struct StatsCommand {
    /// Identity id or name
    identity: String,
}

impl StatsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let identity = find_identity(&db, &self.identity)?;
        let stats = db.detection_stats(identity.id)?;
        output_result(
            &json!({ "id": identity.id, "name": identity.name, "stats": stats }),
            cli.json,
        )
    }
}

#[derive(Args)]
pub struct GroupsCommand {
    /// Also list active members of each group
    #[arg(short = 'm', long)]
    members: bool,
}

impl GroupsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let mut out = Vec::new();
        for group in db.list_groups()? {
            let mut entry = json!(group);
            if self.members {
                let names: Vec<String> = db
                    .list_identities_by_group(&group.name)?
                    .into_iter()
                    .map(|i| i.name)
                    .collect();
                entry["members"] = json!(names);
            }
            out.push(entry);
        }
        output_result(&out, cli.json)
    }
}

#[derive(Args)]
pub struct VerifyCommand {}

impl VerifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let db = open_db(cli)?;
        let report = db.verify_encodings()?;
        output_result(&report, cli.json)?;
        if !report.is_clean() {
            anyhow::bail!(
                "{} of {} encodings do not have dimension {}",
                report.invalid.len(),
                report.total,
                report.dim
            );
        }
        Ok(())
    }
}
