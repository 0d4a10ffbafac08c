//! Roster matcher – the list of registered participant names.
//!
//! Matching is loose: a name is accepted when it equals,
//! contains, or is contained by any roster entry. Short queries therefore
//! match long names ("ali" matches "alibaba"). An empty roster accepts
//! everything, so validation never blocks the user when the source is
//! missing or still loading.

use std::io::Read;
use std::path::Path;

/// Column holding the participant name in the registration export (column C).
pub const DEFAULT_NAME_COLUMN: usize = 2;

/// Suggestions shown for a single query.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// An ordered list of normalised (trimmed, lowercased) names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<String>,
}

impl Roster {
    /// Build a roster from raw names. Blank names are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = names
            .into_iter()
            .map(|n| normalize(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { entries }
    }

    /// Parse CSV data. The first row is a header and is skipped; the name is
    /// read from `name_column` of every following row.
    pub fn from_csv<R: Read>(reader: R, name_column: usize) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut names = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if let Some(name) = record.get(name_column) {
                names.push(name.to_string());
            }
        }
        Ok(Self::new(names))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` belongs to a registered participant.
    ///
    /// Returns `true` unconditionally while the roster is empty.
    pub fn is_valid(&self, name: &str) -> bool {
        if self.entries.is_empty() {
            log::warn!("Participant roster not loaded; accepting {name:?}");
            return true;
        }
        let needle = normalize(name);
        self.entries
            .iter()
            .any(|e| *e == needle || e.contains(&needle) || needle.contains(e.as_str()))
    }

    /// Up to `limit` entries containing `query`, in roster order, title-cased
    /// for display.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = normalize(query);
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.contains(&needle))
            .take(limit)
            .map(|e| title_case(e))
            .collect()
    }
}

/// Read and parse a roster file.
///
/// Never fails: any I/O or parse error is logged and an empty roster is
/// returned, which puts validation into accept-all mode.
pub async fn load(path: impl AsRef<Path>, name_column: usize) -> Roster {
    let path = path.as_ref();
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            log::error!("Error loading participants from '{}': {e}", path.display());
            return Roster::default();
        }
    };
    match Roster::from_csv(bytes.as_slice(), name_column) {
        Ok(roster) => {
            log::info!("Loaded {} participants from '{}'", roster.len(), path.display());
            roster
        }
        Err(e) => {
            log::error!("Error parsing participants CSV '{}': {e}", path.display());
            Roster::default()
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Uppercase the first character of every word.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
