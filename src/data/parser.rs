//! Best-effort scanner for free-form three-line element text

use super::element_set::ElementSet;

/// Maximum number of element sets kept from one text source
pub const DEFAULT_LIMIT: usize = 400;

/// Options for scanning element set text
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Keep at most this many element sets
    pub limit: usize,
    /// Reject groups whose data lines fail the modulo-10 checksum
    pub verify_checksums: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            verify_checksums: false,
        }
    }
}

/// Parse text into element sets, keeping at most `limit` of them
pub fn parse(text: &str, limit: usize) -> Vec<ElementSet> {
    parse_with(
        text,
        &ParseOptions {
            limit,
            ..Default::default()
        },
    )
}

/// Parse text into element sets
///
/// Every non-blank line is a candidate name; the group is accepted when the
/// two following lines carry the `1 ` / `2 ` markers. Noise lines are stepped
/// over one at a time and a trailing fragment shorter than three lines is
/// dropped.
pub fn parse_with(text: &str, options: &ParseOptions) -> Vec<ElementSet> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;

    while i + 2 < lines.len() && sets.len() < options.limit {
        let (name, line1, line2) = (lines[i], lines[i + 1], lines[i + 2]);

        // A missing marker means this window is not aligned on a record
        let Ok(set) = ElementSet::new(name, line1, line2) else {
            i += 1;
            continue;
        };

        if options.verify_checksums {
            if let Err(e) = set.verify_checksums() {
                log::debug!("Skipping {:?}: {}", name, e);
                i += 1;
                continue;
            }
        }

        sets.push(set);
        i += 3;
    }

    if sets.len() < options.limit && i < lines.len() {
        log::trace!("Dropped {} trailing line(s)", lines.len() - i);
    }

    sets
}
