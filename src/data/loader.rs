//! Loading element set text from files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;

use super::{parse_with, ElementSet, ParseOptions};

/// Read a whole element set file as text, decompressing `.gz` files
pub fn read_element_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    log::info!("Reading element sets from {:?}", path);

    let file = File::open(path)
        .with_context(|| format!("Failed to open element set file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut text = String::new();
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        GzDecoder::new(reader)
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to decompress {:?}", path))?;
    } else {
        let mut reader = reader;
        reader
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read {:?} as UTF-8 text", path))?;
    }

    Ok(text)
}

/// Load and parse an element set file
///
/// Malformed groups are skipped by the parser; a file without a single usable
/// record is an error.
pub fn load_element_sets(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Vec<ElementSet>> {
    let path = path.as_ref();
    let text = read_element_text(path)?;
    let sets = parse_with(&text, options);

    if sets.is_empty() {
        bail!("No element sets found in {:?}", path);
    }

    log::info!(
        "Loaded {} element sets from {:?} (limit {})",
        sets.len(),
        path,
        options.limit
    );
    Ok(sets)
}

/// Find an element set by designation, ignoring case and surrounding whitespace
pub fn find_by_designation<'a>(sets: &'a [ElementSet], designation: &str) -> Option<&'a ElementSet> {
    let wanted = designation.trim();
    sets.iter()
        .find(|set| set.designation().eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::element_set::fixtures::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("orbitrack-{}-{}", std::process::id(), name))
    }

    fn sample_text() -> String {
        format!(
            "{}\n{}\n{}\n\n{}\n{}\n{}\n",
            ISS_NAME, ISS_LINE1, ISS_LINE2, VANGUARD_NAME, VANGUARD_LINE1, VANGUARD_LINE2
        )
    }

    #[test]
    fn test_load_plain_file() {
        let path = temp_path("plain.txt");
        std::fs::write(&path, sample_text()).unwrap();

        let sets = load_element_sets(&path, &ParseOptions::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].designation(), ISS_NAME);
    }

    #[test]
    fn test_load_gzip_file() {
        let path = temp_path("packed.txt.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(sample_text().as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let sets = load_element_sets(&path, &ParseOptions::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].designation(), VANGUARD_NAME);
    }

    #[test]
    fn test_load_without_records_fails() {
        let path = temp_path("empty.txt");
        std::fs::write(&path, "nothing to see\nhere\n").unwrap();

        let result = load_element_sets(&path, &ParseOptions::default());
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        let result = load_element_sets(temp_path("missing.txt"), &ParseOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_find_by_designation() {
        let sets = vec![iss(), vanguard()];
        let found = find_by_designation(&sets, "  vanguard 1 ").unwrap();
        assert_eq!(found.catalog_number(), Some("00005"));
        assert!(find_by_designation(&sets, "HUBBLE").is_none());
    }
}
