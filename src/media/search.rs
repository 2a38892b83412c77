use crate::utils::clean_search_query;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{io::Read, path::Path};
use tracing::{debug, info};

/// Column label that marks the header row of a search CSV.
pub const HEADER_LABEL: &str = "title";

/// Reads `artist;title` rows from a semicolon separated file and turns them
/// into cleaned search expressions.
pub fn read_search_terms(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open search file {}", path.display()))?;
    let terms = parse_search_terms(file)
        .with_context(|| format!("Failed to read search file {}", path.display()))?;
    info!("Read {} search terms from {}", terms.len(), path.display());
    Ok(terms)
}

pub fn parse_search_terms<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut terms = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        if index == 0 && is_header(&record) {
            debug!("Skipping header row: {:?}", record);
            continue;
        }

        let joined = record
            .iter()
            .filter(|cell| !cell.is_empty())
            .collect::<Vec<_>>()
            .join(" - ");
        let term = clean_search_query(&joined);
        if !term.is_empty() {
            terms.push(term);
        }
    }

    Ok(terms)
}

/// Only the first row can be a header.
fn is_header(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .any(|cell| cell.eq_ignore_ascii_case(HEADER_LABEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_terms_skips_header() {
        let data = "artist;title\nDaft Punk;One More Time (Official Video)\nAdele;Hello\n";
        let terms = parse_search_terms(data.as_bytes()).unwrap();
        assert_eq!(terms, vec!["Daft Punk - One More Time", "Adele - Hello"]);
    }

    #[test]
    fn test_parse_search_terms_without_header() {
        let data = "Stromae;Alors on danse\n";
        let terms = parse_search_terms(data.as_bytes()).unwrap();
        assert_eq!(terms, vec!["Stromae - Alors on danse"]);
    }

    #[test]
    fn test_parse_search_terms_uneven_and_empty_rows() {
        let data = "Title\nsingle cell\n;Only Title\n;\n(Live)\n";
        let terms = parse_search_terms(data.as_bytes()).unwrap();
        assert_eq!(terms, vec!["single cell", "Only Title"]);
    }

    #[test]
    fn test_parse_search_terms_keeps_title_track_after_header() {
        let data = "artist;title\nThe Band;Title\nTitle;Song\n";
        let terms = parse_search_terms(data.as_bytes()).unwrap();
        assert_eq!(terms, vec!["The Band - Title", "Title - Song"]);
    }

    #[test]
    fn test_read_search_terms_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlist.csv");
        std::fs::write(&path, "artist;title\nMagic System;Premier Gaou\n").unwrap();

        let terms = read_search_terms(&path).unwrap();
        assert_eq!(terms, vec!["Magic System - Premier Gaou"]);
    }

    #[test]
    fn test_read_search_terms_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_search_terms(&dir.path().join("missing.csv")).is_err());
    }
}
