//! Raw character JSON → flat rows

use crate::schema::{FlatRecord, Page, RawCharacter};

/// Placeholder for any missing text field
pub const UNKNOWN: &str = "Unknown";

/// Flatten every character on a page, in source order.
///
/// A missing page or a page without `results` yields no rows.
pub fn map_page(page: Option<&Page>) -> Vec<FlatRecord> {
    let Some(results) = page.and_then(|p| p.results.as_ref()) else {
        return Vec::new();
    };
    results.iter().map(flatten).collect()
}

/// Flatten one character, substituting [`UNKNOWN`] for missing fields.
pub fn flatten(raw: &RawCharacter) -> FlatRecord {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());

    FlatRecord {
        id: raw.id,
        name: text(&raw.name),
        status: text(&raw.status),
        species: text(&raw.species),
        episode_count: raw.episode.as_ref().map_or(0, Vec::len),
        location: raw
            .location
            .as_ref()
            .and_then(|loc| loc.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// Tidy records before export: trim names, title-case species.
pub fn clean_records(records: Vec<FlatRecord>) -> Vec<FlatRecord> {
    records
        .into_iter()
        .map(|mut rec| {
            rec.name = rec.name.trim().to_string();
            rec.species = title_case(&rec.species);
            rec
        })
        .collect()
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
