//! Dotted numeric versions with zero-padded ordering

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::version::error::VersionParseError;

/// A parsed dotted numeric version such as `1.4.0` or `2.3.1.0`.
///
/// Ordering compares components left to right and treats missing trailing
/// components as zero, so `1.4.0` and `1.4.0.0` are equal.
#[derive(Debug, Clone)]
pub struct VersionString {
    components: Vec<u64>,
}

impl VersionString {
    /// Parse a dotted numeric string.
    ///
    /// Every segment must be a non-empty run of ASCII digits.
    ///
    /// Examples:
    /// - "1.4.0" -> [1, 4, 0]
    /// - "10.0.17763.1" -> [10, 0, 17763, 1]
    /// - "" / "a.b.c" / "1..2" / "v1.0" -> error
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        if text.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let components = text
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionParseError::InvalidComponent {
                        input: text.to_string(),
                        component: segment.to_string(),
                    });
                }
                segment
                    .parse::<u64>()
                    .map_err(|_| VersionParseError::InvalidComponent {
                        input: text.to_string(),
                        component: segment.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    /// Render at most `max_components` leading components for display.
    ///
    /// Windows reports some driver versions with four components while the
    /// documentation pages use three; the table shows the shorter form.
    pub fn canonicalize(&self, max_components: usize) -> String {
        self.components
            .iter()
            .take(max_components)
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl Ord for VersionString {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionString {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionString {}

impl FromStr for VersionString {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonicalize(self.components.len()))
    }
}
