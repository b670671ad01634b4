//! Two-line element set records

use serde::Serialize;

/// Marker that opens the first data line of a TLE
pub const LINE1_MARKER: &str = "1 ";
/// Marker that opens the second data line of a TLE
pub const LINE2_MARKER: &str = "2 ";

/// Fixed width of a TLE data line including the checksum digit
pub const TLE_LINE_LENGTH: usize = 69;

/// Errors raised while reading element set text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Data line does not start with its expected marker
    MissingMarker { line: u8 },

    /// Data line is shorter than the fixed TLE width
    ShortLine { line: u8, length: usize },

    /// Trailing checksum digit does not match the line contents
    Checksum { line: u8, expected: u8, found: char },

    /// A fixed-width field could not be decoded
    Field { name: &'static str, value: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMarker { line } => {
                write!(f, "Line {} does not start with \"{} \"", line, line)
            }
            Self::ShortLine { line, length } => {
                write!(
                    f,
                    "Line {} has {} characters, expected {}",
                    line, length, TLE_LINE_LENGTH
                )
            }
            Self::Checksum {
                line,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Line {} checksum mismatch: computed {}, found '{}'",
                    line, expected, found
                )
            }
            Self::Field { name, value } => {
                write!(f, "Could not decode {} from {:?}", name, value)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// One named two-line element set
///
/// The two data lines are kept verbatim; the orbital model decodes them when
/// propagating. Fields are private so a set cannot change after it was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSet {
    designation: String,
    line1: String,
    line2: String,
}

impl ElementSet {
    /// Build an element set, checking the line markers
    pub fn new(
        designation: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let line1 = line1.into();
        let line2 = line2.into();

        if !line1.starts_with(LINE1_MARKER) {
            return Err(ParseError::MissingMarker { line: 1 });
        }
        if !line2.starts_with(LINE2_MARKER) {
            return Err(ParseError::MissingMarker { line: 2 });
        }

        Ok(Self {
            designation: designation.into(),
            line1,
            line2,
        })
    }

    pub fn designation(&self) -> &str {
        &self.designation
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Satellite catalog number (line 1, columns 3-7)
    pub fn catalog_number(&self) -> Option<&str> {
        let field = self.line1.get(2..7)?.trim();
        if field.is_empty() {
            None
        } else {
            Some(field)
        }
    }

    /// Stable identifier: the catalog number, or the designation when blank
    pub fn identifier(&self) -> String {
        self.catalog_number()
            .map(str::to_string)
            .unwrap_or_else(|| self.designation.clone())
    }

    /// Mean motion in revolutions per day (line 2, columns 53-63)
    pub fn mean_motion_rev_per_day(&self) -> Result<f64, ParseError> {
        let raw = self.line2.get(52..63).ok_or(ParseError::ShortLine {
            line: 2,
            length: self.line2.len(),
        })?;

        raw.trim()
            .parse::<f64>()
            .map_err(|_| ParseError::Field {
                name: "mean motion",
                value: raw.to_string(),
            })
    }

    /// Verify the modulo-10 checksum of both data lines
    pub fn verify_checksums(&self) -> Result<(), ParseError> {
        verify_line_checksum(&self.line1, 1)?;
        verify_line_checksum(&self.line2, 2)
    }

    pub fn checksums_valid(&self) -> bool {
        self.verify_checksums().is_ok()
    }
}

/// Modulo-10 checksum over the first 68 columns: digits count at face value,
/// minus signs count as one, everything else as zero.
pub fn line_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .chars()
        .take(TLE_LINE_LENGTH - 1)
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

fn verify_line_checksum(line: &str, number: u8) -> Result<(), ParseError> {
    let found = match line.chars().nth(TLE_LINE_LENGTH - 1) {
        Some(c) => c,
        None => {
            return Err(ParseError::ShortLine {
                line: number,
                length: line.chars().count(),
            })
        }
    };

    let expected = line_checksum(line);
    if found.to_digit(10) == Some(expected as u32) {
        Ok(())
    } else {
        Err(ParseError::Checksum {
            line: number,
            expected,
            found,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const ISS_NAME: &str = "ISS (ZARYA)";
    pub const ISS_LINE1: &str =
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    pub const ISS_LINE2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    pub const VANGUARD_NAME: &str = "VANGUARD 1";
    pub const VANGUARD_LINE1: &str =
        "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    pub const VANGUARD_LINE2: &str =
        "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";

    pub fn iss() -> super::ElementSet {
        super::ElementSet::new(ISS_NAME, ISS_LINE1, ISS_LINE2).unwrap()
    }

    pub fn vanguard() -> super::ElementSet {
        super::ElementSet::new(VANGUARD_NAME, VANGUARD_LINE1, VANGUARD_LINE2).unwrap()
    }

    /// Same record with its mean motion field overwritten by garbage
    pub fn corrupted_mean_motion() -> super::ElementSet {
        let mut line2 = ISS_LINE2.to_string();
        line2.replace_range(52..63, "XX.XXXXXXXX");
        super::ElementSet::new("CORRUPT", ISS_LINE1, line2).unwrap()
    }

    /// ISS record with a mean motion whose orbit lies inside the Earth
    pub const BELOW_SURFACE_LINE2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 17.50000000563534";

    pub fn below_surface() -> super::ElementSet {
        super::ElementSet::new("REENTERED", ISS_LINE1, BELOW_SURFACE_LINE2).unwrap()
    }

    /// ISS record with its mean motion field replaced by `field` (11 columns)
    pub fn with_mean_motion(field: &str) -> super::ElementSet {
        let mut line2 = ISS_LINE2.to_string();
        line2.replace_range(52..63, &format!("{:<11}", field));
        super::ElementSet::new("ALTERED", ISS_LINE1, line2).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_markers_are_required() {
        assert_eq!(
            ElementSet::new("X", ISS_LINE2, ISS_LINE2),
            Err(ParseError::MissingMarker { line: 1 })
        );
        assert_eq!(
            ElementSet::new("X", ISS_LINE1, ISS_LINE1),
            Err(ParseError::MissingMarker { line: 2 })
        );
    }

    #[test]
    fn test_field_accessors() {
        let iss = iss();
        assert_eq!(iss.catalog_number(), Some("25544"));
        assert_eq!(iss.identifier(), "25544");

        let n = iss.mean_motion_rev_per_day().unwrap();
        assert!((n - 15.72125391).abs() < 1e-9, "mean motion {}", n);

        let vanguard = vanguard();
        assert_eq!(vanguard.catalog_number(), Some("00005"));
    }

    #[test]
    fn test_corrupted_mean_motion_is_reported() {
        let corrupt = corrupted_mean_motion();
        assert!(matches!(
            corrupt.mean_motion_rev_per_day(),
            Err(ParseError::Field {
                name: "mean motion",
                ..
            })
        ));
    }

    #[test]
    fn test_checksums() {
        assert_eq!(line_checksum(ISS_LINE1), 7);
        assert_eq!(line_checksum(VANGUARD_LINE1), 3);
        assert!(iss().checksums_valid());
        assert!(vanguard().checksums_valid());

        let mut bad = ISS_LINE1.to_string();
        bad.replace_range(68..69, "0");
        let set = ElementSet::new(ISS_NAME, bad, ISS_LINE2).unwrap();
        assert_eq!(
            set.verify_checksums(),
            Err(ParseError::Checksum {
                line: 1,
                expected: 7,
                found: '0'
            })
        );
    }

    #[test]
    fn test_short_line_fails_checksum() {
        let set = ElementSet::new("SHORT", "1 25544U", ISS_LINE2).unwrap();
        assert!(matches!(
            set.verify_checksums(),
            Err(ParseError::ShortLine { line: 1, .. })
        ));
    }
}
