//! Profile commands - Manage connection profiles

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use mirrorlake_core::domain::NewProfile;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Add a new connection profile
    Add(AddArgs),
    /// List saved profiles
    List,
    /// Remove a profile and all of its cached data
    Remove(RemoveArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Profile name
    pub name: String,

    /// Access key id
    #[arg(long)]
    pub access_key: String,

    /// Secret access key
    #[arg(long)]
    pub secret_key: String,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Custom endpoint for S3-compatible services
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Profile id to remove
    pub id: i64,
}

impl ProfileCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        match self {
            Self::Add(args) => {
                let payload = NewProfile {
                    name: args.name.clone(),
                    access_key_id: args.access_key.clone(),
                    secret_access_key: args.secret_key.clone(),
                    region: args.region.clone(),
                    endpoint: args.endpoint.clone(),
                };
                payload.validate()?;

                let saved = repo.save_profile(&payload).await?;
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "id": saved.id,
                        "name": saved.name,
                        "region": saved.region,
                        "endpoint": saved.endpoint,
                    }));
                } else {
                    formatter.success(&format!("Profile '{}' saved with id {}", saved.name, saved.id));
                }
            }
            Self::List => {
                let profiles = repo.list_profiles().await?;
                if matches!(format, OutputFormat::Json) {
                    let json: Vec<_> = profiles
                        .iter()
                        .map(|p| {
                            serde_json::json!({
                                "id": p.id,
                                "name": p.name,
                                "region": p.region,
                                "endpoint": p.endpoint,
                                "created_at": p.created_at.to_rfc3339(),
                            })
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!({ "profiles": json }));
                    return Ok(());
                }

                if profiles.is_empty() {
                    formatter.info("No profiles saved. Run 'mirrorlake profile add' first.");
                    return Ok(());
                }
                formatter.success(&format!("{} profile(s)", profiles.len()));
                for p in &profiles {
                    let endpoint = p.endpoint.as_deref().unwrap_or("default");
                    formatter.info(&format!(
                        "[{}] {} ({}, {})",
                        p.id, p.name, p.region, endpoint
                    ));
                }
            }
            Self::Remove(args) => {
                if repo.get_profile(args.id).await?.is_none() {
                    formatter.error(&format!("No profile with id {}", args.id));
                    return Ok(());
                }
                repo.delete_profile(args.id).await?;
                formatter.success(&format!(
                    "Profile {} removed along with its cached data",
                    args.id
                ));
            }
        }
        Ok(())
    }
}
