//! Writes a finished collection as JSON files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rankscrape_harvest::{CollectionOutput, Sink, SinkError};

/// Writes `<prefix>ranking_<tag>.json` and `<prefix>details_<tag>.json`
/// into one directory.
pub(crate) struct JsonFileSink {
    dir: PathBuf,
    prefix: String,
}

impl JsonFileSink {
    pub(crate) fn new(dir: PathBuf, prefix: String) -> Self {
        Self { dir, prefix }
    }

    fn path(&self, kind: &str, tag: &str) -> PathBuf {
        self.dir.join(format!("{}{kind}_{tag}.json", self.prefix))
    }
}

async fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), SinkError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[async_trait]
impl Sink for JsonFileSink {
    async fn accept(&self, output: &CollectionOutput) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let rankings = self.path("ranking", &output.file_tag);
        write_json(&rankings, &output.rankings).await?;
        let details = self.path("details", &output.file_tag);
        write_json(&details, &output.details).await?;

        tracing::info!(
            rankings = %rankings.display(),
            details = %details.display(),
            records = output.details.len(),
            "collection exported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rankscrape_core::{EntitySummary, StreamId};

    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rankscrape-{}", uuid::Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn writes_ranking_and_detail_files() {
        let dir = scratch_dir();
        let sink = JsonFileSink::new(dir.clone(), "day3_".to_owned());
        let mut rankings = BTreeMap::new();
        rankings.insert(
            StreamId::new("day-total"),
            vec![EntitySummary {
                key: "P1".to_owned(),
                rank: 1,
                score: 500,
                category: None,
            }],
        );
        let output = CollectionOutput {
            plan: "grand-prix 805103".to_owned(),
            file_tag: "current-day".to_owned(),
            previous_day: false,
            rankings,
            details: Vec::new(),
        };

        sink.accept(&output).await.unwrap();

        let ranking_file = dir.join("day3_ranking_current-day.json");
        let parsed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&ranking_file).unwrap()).unwrap();
        assert_eq!(parsed["day-total"][0]["key"], "P1");
        let details = std::fs::read_to_string(dir.join("day3_details_current-day.json")).unwrap();
        assert_eq!(details.trim(), "[]");

        std::fs::remove_dir_all(dir).unwrap();
    }
}
