//! Wire shapes of the character endpoint and the flat output row

use rmetl_core::Tabular;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// === API payload (deserialized from JSON) ===

/// One page of `GET /character?page=N`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub info: Option<PageInfo>,

    #[serde(default)]
    pub results: Option<Vec<RawCharacter>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub count: Option<u64>,

    #[serde(default)]
    pub pages: Option<u32>,

    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub prev: Option<String>,
}

impl Page {
    /// Total page count from `info.pages`, 0 when absent
    pub fn total_pages(&self) -> u32 {
        self.info.as_ref().and_then(|i| i.pages).unwrap_or(0)
    }
}

/// Character as the API returns it; every field may be missing.
///
/// A field of the wrong JSON type reads as `None`, so one malformed
/// character never fails the rest of its page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCharacter {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,

    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub species: Option<String>,

    /// Episode URLs; only the count is kept
    #[serde(default, alias = "episodes", deserialize_with = "lenient")]
    pub episode: Option<Vec<serde_json::Value>>,

    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Any JSON value; `None` unless it has the shape of `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

// === Output row ===

/// Normalized character row written to every sink.
///
/// Field order is the column order of the CSV header and the SQL table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    /// Passed through as-is; `None` only for malformed source records
    pub id: Option<i64>,
    pub name: String,
    pub status: String,
    pub species: String,
    pub episode_count: usize,
    pub location: String,
}

impl Tabular for FlatRecord {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "status",
        "species",
        "episode_count",
        "location",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.map(|id| id.to_string()).unwrap_or_default(),
            self.name.clone(),
            self.status.clone(),
            self.species.clone(),
            self.episode_count.to_string(),
            self.location.clone(),
        ]
    }
}
