// Version parsing and comparison for mod release strings

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

lazy_static::lazy_static! {
    /// "MC1.19.2-1.0.0" -> "1.0.0"
    static ref MC_PREFIXED: Regex = Regex::new(r"MC\d+\.\d+(\.\d+)?-([0-9.]+)").unwrap();
    /// "mod-1.2.3" -> "1.2.3"
    static ref NAME_PREFIXED: Regex = Regex::new(r"[a-zA-Z]+-(\d+\.\d+(\.\d+)?)").unwrap();
    static ref NON_DIGITS: Regex = Regex::new(r"[^0-9]+").unwrap();
    static ref SEMVER_PRERELEASE: Regex = Regex::new(r"-([a-zA-Z0-9.-]+)(?:\+|$)").unwrap();
    static ref SEMVER_BUILD: Regex = Regex::new(r"\+([a-zA-Z0-9.-]+)$").unwrap();
    static ref KEYWORD_PRERELEASE: Regex =
        Regex::new(r"(?i)[._-](alpha|beta|pre|rc|snapshot)[._-]?(\d*)").unwrap();
}

/// One numeric component of any size
///
/// Stored as its digits without leading zeros, so ordering by length and then
/// by digits matches numeric ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component(String);

impl Component {
    fn from_digits(digits: &str) -> Self {
        match digits.trim_start_matches('0') {
            "" => Self::zero(),
            trimmed => Self(trimmed.to_string()),
        }
    }

    pub fn zero() -> Self {
        Self("0".to_string())
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u64> for Component {
    fn eq(&self, other: &u64) -> bool {
        self.0 == other.to_string()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed version string
///
/// Ordering compares `components` as integer tuples (no zero padding), then
/// ranks a prerelease below a release with the same components. `build` never
/// affects ordering but does take part in equality, so two versions that only
/// differ in build metadata are neither equal nor ordered.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    pub normalized: String,
    pub components: Vec<Component>,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

impl Version {
    /// Parse any string; one with no digits gets the components `[0]`
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        let components = parse_components(&normalized);
        let (prerelease, build) = extract_prerelease_and_build(&normalized);

        Self {
            original: raw.to_string(),
            normalized,
            components,
            prerelease,
            build,
        }
    }

    /// Precedence ordering, ignoring build metadata
    pub fn precedence(&self, other: &Self) -> Ordering {
        // Compares like tuples: a shorter prefix sorts first
        match self.components.cmp(&other.components) {
            Ordering::Equal => {}
            unequal => return unequal,
        }

        match (&self.prerelease, &other.prerelease) {
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
            && self.prerelease == other.prerelease
            && self.build == other.build
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.precedence(other) {
            Ordering::Equal if self.build != other.build => None,
            ordering => Some(ordering),
        }
    }
}

/// Normalize a raw version string for comparison
///
/// Strips leading `v`s, collapses `MC1.19.2-1.0.0` and `name-1.2.3` style
/// strings down to their embedded version, and trims whitespace.
pub fn normalize(raw: &str) -> String {
    let mut version = raw.trim_start().trim_start_matches(['v', 'V']).to_string();

    if let Some(caps) = MC_PREFIXED.captures(&version) {
        version = caps[2].to_string();
    }

    if let Some(caps) = NAME_PREFIXED.captures(&version) {
        version = caps[1].to_string();
    }

    version.trim().to_string()
}

/// Extract the numeric components of a normalized version string
///
/// Only the segment before the first `-` or `+` is considered. Never returns
/// an empty vector.
pub fn parse_components(normalized: &str) -> Vec<Component> {
    let end = normalized.find(['-', '+']).unwrap_or(normalized.len());
    let numeric_part = &normalized[..end];

    let components: Vec<Component> = NON_DIGITS
        .split(numeric_part)
        .filter(|part| !part.is_empty())
        .map(Component::from_digits)
        .collect();

    if components.is_empty() {
        vec![Component::zero()]
    } else {
        components
    }
}

/// Extract prerelease and build tags from a normalized version string
///
/// Returns `(prerelease, build)`. Besides semver tags, keyword suffixes like
/// `1.2.3_beta2` are recognized and reported as `beta.2`.
pub fn extract_prerelease_and_build(normalized: &str) -> (Option<String>, Option<String>) {
    let mut prerelease = SEMVER_PRERELEASE
        .captures(normalized)
        .map(|caps| caps[1].to_string());

    let build = SEMVER_BUILD
        .captures(normalized)
        .map(|caps| caps[1].to_string());

    if prerelease.is_none()
        && let Some(caps) = KEYWORD_PRERELEASE.captures(normalized)
    {
        let keyword = caps[1].to_lowercase();
        let number = match &caps[2] {
            "" => "0",
            digits => digits,
        };
        prerelease = Some(format!("{}.{}", keyword, number));
    }

    (prerelease, build)
}

/// Whether `latest` is a newer release than `current`
pub fn has_update(current: &str, latest: &str) -> bool {
    let current_version = Version::parse(current);
    let latest_version = Version::parse(latest);

    match latest_version.partial_cmp(&current_version) {
        Some(ordering) => ordering == Ordering::Greater,
        None => {
            log::debug!(
                "Versions {} and {} differ only in build metadata, comparing positionally",
                current,
                latest
            );
            has_update_padded(current, latest)
        }
    }
}

/// Positional comparison used when `Version` ordering is undefined
///
/// Missing positions count as zero, so `1.2` and `1.2.0` compare equal here
/// even though `Version` ordering ranks `1.2` lower.
pub fn has_update_padded(current: &str, latest: &str) -> bool {
    let current = normalize(current);
    let latest = normalize(latest);

    if current == latest {
        return false;
    }

    let current_parts = parse_components(&current);
    let latest_parts = parse_components(&latest);

    for i in 0..current_parts.len().max(latest_parts.len()) {
        let current_part = current_parts.get(i).cloned().unwrap_or_else(Component::zero);
        let latest_part = latest_parts.get(i).cloned().unwrap_or_else(Component::zero);

        match latest_part.cmp(&current_part) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }

    false
}

/// Whether a string looks like a version at all
pub fn is_valid(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }

    let normalized = normalize(raw);
    !parse_components(&normalized).is_empty() && normalized.chars().any(|c| c.is_ascii_digit())
}
