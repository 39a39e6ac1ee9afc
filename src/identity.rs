use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::NameOverride;

/// Canonical full player name; the join key between sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerKey(String);

impl PlayerKey {
    /// Wrap an already-canonical name without normalizing it.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque season identifier such as `20152016`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonTag(String);

impl SeasonTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    C,
    D,
    L,
    R,
}

impl Position {
    pub fn parse(raw: &str) -> Option<Position> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "C" => Some(Position::C),
            "D" | "LD" | "RD" => Some(Position::D),
            "L" | "LW" => Some(Position::L),
            "R" | "RW" => Some(Position::R),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Position::C => "C",
            Position::D => "D",
            Position::L => "L",
            Position::R => "R",
        }
    }
}

/// Sorted, de-duplicated, comma-joined position codes, e.g. `C,L`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionSet(String);

impl PositionSet {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split(',').filter(|c| !c.is_empty())
    }

    pub fn contains(&self, position: Position) -> bool {
        self.codes().any(|c| c == position.code())
    }
}

impl fmt::Display for PositionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a free-text name into a [`PlayerKey`].
///
/// "First.Last" style names are split on the last period. Each half keeps only
/// letters, spaces, hyphens and apostrophes and is title-cased. The first override
/// whose pattern occurs in the cleaned name then replaces it wholesale.
pub fn normalize_name(raw: &str, overrides: &[NameOverride]) -> PlayerKey {
    let trimmed = raw.trim();
    let cleaned = match trimmed.rsplit_once('.') {
        Some((first, last)) => {
            let parts = [clean_part(first), clean_part(last)];
            parts
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        }
        None => clean_part(trimmed),
    };

    for o in overrides {
        if cleaned.contains(o.pattern.as_str()) {
            return PlayerKey(o.canonical.clone());
        }
    }
    PlayerKey(cleaned)
}

fn clean_part(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphabetic() || *c == ' ' || *c == '-' || *c == '\'')
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    title_case(&collapsed)
}

// Upper-case a letter when the previous char is not a letter, lower-case otherwise.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Canonicalize a source-specific position string (`LW, C`, `RD`, `C/RW`).
///
/// Wing and handedness qualifiers are stripped, goalies dropped, and unknown
/// tokens kept upper-cased rather than rejected.
pub fn canonical_positions(raw: &str) -> PositionSet {
    let mut codes: Vec<String> = Vec::new();
    for token in raw.split([',', '/']) {
        let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        let upper = compact.to_ascii_uppercase();
        let code = match Position::parse(&upper) {
            Some(p) => p.code().to_string(),
            None => upper.replace('W', ""),
        };
        if code.is_empty() || code == "G" {
            continue;
        }
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes.sort();
    PositionSet(codes.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_joined_names_split_on_last_period() {
        assert_eq!(normalize_name("CONNOR.MCDAVID", &[]).as_str(), "Connor Mcdavid");
        assert_eq!(normalize_name("P.A. Parenteau", &[]).as_str(), "Pa Parenteau");
        assert_eq!(normalize_name("RYAN.O'REILLY", &[]).as_str(), "Ryan O'Reilly");
    }

    #[test]
    fn strips_disallowed_characters() {
        assert_eq!(normalize_name("  Oliver  Ekman-Larsson* ", &[]).as_str(), "Oliver Ekman-Larsson");
        assert_eq!(normalize_name("Jamie Benn (DAL)", &[]).as_str(), "Jamie Benn Dal");
    }

    #[test]
    fn override_replaces_whole_name() {
        let overrides = vec![NameOverride::new("Alexander Ovechkin", "Alex Ovechkin")];
        assert_eq!(
            normalize_name("ALEXANDER.OVECHKIN", &overrides).as_str(),
            "Alex Ovechkin"
        );
        assert_eq!(normalize_name("Alex Ovechkin", &overrides).as_str(), "Alex Ovechkin");
    }

    #[test]
    fn normalization_is_idempotent() {
        let overrides = vec![NameOverride::new("Pierre-Alexandre Parenteau", "Pa Parenteau")];
        for raw in ["PIERRE-ALEXANDRE.PARENTEAU", "t.j. oshie", "Sidney Crosby", "ÉRIK.KARLSSON"] {
            let once = normalize_name(raw, &overrides);
            let twice = normalize_name(once.as_str(), &overrides);
            assert_eq!(once, twice, "{raw}");
        }
    }

    #[test]
    fn positions_are_sorted_and_deduplicated() {
        assert_eq!(canonical_positions("RW, LW").as_str(), "L,R");
        assert_eq!(canonical_positions("C,LW,C").as_str(), "C,L");
        assert_eq!(canonical_positions("RD").as_str(), "D");
        assert_eq!(canonical_positions("LD, RD").as_str(), "D");
        assert_eq!(canonical_positions("G").as_str(), "");
        assert_eq!(canonical_positions(" c ").as_str(), "C");
    }

    #[test]
    fn positions_are_idempotent() {
        let once = canonical_positions("LW,C,RW");
        assert_eq!(canonical_positions(once.as_str()), once);
        assert!(once.contains(Position::C));
        assert!(!once.contains(Position::D));
    }
}
