//! Search command - Search cached object keys and bucket names

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::open_repository;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Profile id
    pub profile: i64,

    /// Search query (case-insensitive substring)
    pub query: String,

    /// Restrict the search to one bucket (omit to search all buckets)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Search bucket names instead of object keys
    #[arg(long, conflicts_with = "bucket")]
    pub buckets: bool,
}

impl SearchCommand {
    pub async fn execute(&self, format: OutputFormat, db: Option<PathBuf>) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let repo = open_repository(db.as_deref()).await?;

        if self.buckets {
            let hits = repo.search_buckets(self.profile, &self.query).await?;
            if matches!(format, OutputFormat::Json) {
                let json: Vec<_> = hits.iter().map(|b| serde_json::json!(b.name)).collect();
                formatter.print_json(&serde_json::json!({ "buckets": json }));
                return Ok(());
            }
            formatter.success(&format!("{} bucket(s) match '{}'", hits.len(), self.query));
            for bucket in &hits {
                formatter.info(&bucket.name);
            }
            return Ok(());
        }

        match &self.bucket {
            Some(bucket) => {
                let hits = repo.search_objects(self.profile, bucket, &self.query).await?;
                if matches!(format, OutputFormat::Json) {
                    let json: Vec<_> = hits.iter().map(|o| serde_json::json!(o.key)).collect();
                    formatter.print_json(&serde_json::json!({ "bucket": bucket, "objects": json }));
                    return Ok(());
                }
                formatter.success(&format!(
                    "{} object(s) match '{}' in {}",
                    hits.len(),
                    self.query,
                    bucket
                ));
                for object in &hits {
                    formatter.info(&object.key);
                }
            }
            None => {
                let hits = repo.search_all_objects(self.profile, &self.query).await?;
                if matches!(format, OutputFormat::Json) {
                    let json: Vec<_> = hits
                        .iter()
                        .map(|m| {
                            serde_json::json!({
                                "bucket": m.bucket_name,
                                "key": m.object.key,
                            })
                        })
                        .collect();
                    formatter.print_json(&serde_json::json!({ "matches": json }));
                    return Ok(());
                }
                formatter.success(&format!(
                    "{} object(s) match '{}' across all buckets",
                    hits.len(),
                    self.query
                ));
                for hit in &hits {
                    formatter.info(&format!("{}/{}", hit.bucket_name, hit.object.key));
                }
            }
        }
        Ok(())
    }
}
