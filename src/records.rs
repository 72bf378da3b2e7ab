use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::pack::BubbleInput;

/// Avatar used for members without a photo.
pub const DEFAULT_AVATAR_URL: &str = "https://www.gravatar.com/avatar/?d=mp&s=200";
pub const DEFAULT_RECORD_LIMIT: usize = 100;

#[derive(Clone, Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "name")]
    label: String,
    #[serde(alias = "weight", alias = "ratio")]
    size: f64,
    #[serde(default, alias = "image")]
    image_url: Option<String>,
}

impl RawRecord {
    fn into_input(self) -> BubbleInput {
        let image_url = match self.image_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                debug!(label = %self.label, "using default avatar");
                DEFAULT_AVATAR_URL.to_owned()
            }
        };

        BubbleInput::new(self.label, self.size).with_image(image_url)
    }
}

pub fn load_records(path: &Path, limit: usize) -> Result<Vec<BubbleInput>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read records from {}", path.display()))?;
    parse_records(&raw, limit).with_context(|| format!("invalid records in {}", path.display()))
}

/// Accepts either a bare JSON array of records or an object holding them
/// under `"records"`. Keeps the first `limit` records in file order.
pub fn parse_records(raw: &str, limit: usize) -> Result<Vec<BubbleInput>> {
    let parsed: Value = serde_json::from_str(raw).context("records are not valid JSON")?;

    let entries = match &parsed {
        Value::Array(entries) => entries,
        Value::Object(object) => object
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("expected a \"records\" array in the JSON object"))?,
        _ => return Err(anyhow!("expected a JSON array of records")),
    };

    let records = entries
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, entry)| {
            RawRecord::deserialize(entry)
                .with_context(|| format!("record {index} is missing a label or size"))
                .map(RawRecord::into_input)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        loaded = records.len(),
        available = entries.len(),
        "loaded member records"
    );
    Ok(records)
}
