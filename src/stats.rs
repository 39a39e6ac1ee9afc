use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Skater statistic columns carried through the valuation pipeline.
///
/// Declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stat {
    #[serde(rename = "GP")]
    GamesPlayed,
    #[serde(rename = "TOI")]
    TimeOnIce,
    #[serde(rename = "G")]
    Goals,
    #[serde(rename = "A")]
    Assists,
    #[serde(rename = "P")]
    Points,
    #[serde(rename = "SH")]
    Shots,
    #[serde(rename = "SH%")]
    ShootingPct,
    #[serde(rename = "FOW")]
    FaceoffsWon,
    #[serde(rename = "FOL")]
    FaceoffsLost,
    #[serde(rename = "HIT")]
    Hits,
    #[serde(rename = "BLK")]
    Blocks,
    #[serde(rename = "PPTOI")]
    PpTimeOnIce,
    #[serde(rename = "PPG")]
    PpGoals,
    #[serde(rename = "PPA")]
    PpAssists,
    #[serde(rename = "PPP")]
    PpPoints,
    #[serde(rename = "PPSH")]
    PpShots,
}

impl Stat {
    pub const ALL: [Stat; 16] = [
        Stat::GamesPlayed,
        Stat::TimeOnIce,
        Stat::Goals,
        Stat::Assists,
        Stat::Points,
        Stat::Shots,
        Stat::ShootingPct,
        Stat::FaceoffsWon,
        Stat::FaceoffsLost,
        Stat::Hits,
        Stat::Blocks,
        Stat::PpTimeOnIce,
        Stat::PpGoals,
        Stat::PpAssists,
        Stat::PpPoints,
        Stat::PpShots,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stat::GamesPlayed => "GP",
            Stat::TimeOnIce => "TOI",
            Stat::Goals => "G",
            Stat::Assists => "A",
            Stat::Points => "P",
            Stat::Shots => "SH",
            Stat::ShootingPct => "SH%",
            Stat::FaceoffsWon => "FOW",
            Stat::FaceoffsLost => "FOL",
            Stat::Hits => "HIT",
            Stat::Blocks => "BLK",
            Stat::PpTimeOnIce => "PPTOI",
            Stat::PpGoals => "PPG",
            Stat::PpAssists => "PPA",
            Stat::PpPoints => "PPP",
            Stat::PpShots => "PPSH",
        }
    }

    /// Column label lookup, including the individual-stat aliases Corsica exports use.
    pub fn from_label(raw: &str) -> Option<Stat> {
        let s = raw.trim();
        if let Some(stat) = Stat::ALL.iter().copied().find(|st| st.label().eq_ignore_ascii_case(s)) {
            return Some(stat);
        }
        match s {
            "iSF" => Some(Stat::Shots),
            "iSh%" => Some(Stat::ShootingPct),
            "iFOW" => Some(Stat::FaceoffsWon),
            "iFOL" => Some(Stat::FaceoffsLost),
            "iHF" => Some(Stat::Hits),
            "iBLK" => Some(Stat::Blocks),
            _ => None,
        }
    }

    /// The statistic a power-play split contributes for this base column, if any.
    /// Games played and faceoffs are already covered by the all-situations row.
    pub fn power_play_counterpart(self) -> Option<Stat> {
        match self {
            Stat::TimeOnIce => Some(Stat::PpTimeOnIce),
            Stat::Goals => Some(Stat::PpGoals),
            Stat::Assists => Some(Stat::PpAssists),
            Stat::Points => Some(Stat::PpPoints),
            Stat::Shots => Some(Stat::PpShots),
            _ => None,
        }
    }

    pub fn is_power_play(self) -> bool {
        matches!(
            self,
            Stat::PpTimeOnIce | Stat::PpGoals | Stat::PpAssists | Stat::PpPoints | Stat::PpShots
        )
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stat::from_label(s).ok_or_else(|| format!("unknown statistic '{s}'"))
    }
}

/// Partition of play a performance row was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Situation {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "5v5")]
    EvenStrength,
    #[serde(rename = "5v4")]
    FiveOnFour,
    #[serde(rename = "5v3")]
    FiveOnThree,
    #[serde(rename = "4v5")]
    FourOnFive,
    #[serde(rename = "3v5")]
    ThreeOnFive,
}

impl Situation {
    pub fn tag(self) -> &'static str {
        match self {
            Situation::All => "all",
            Situation::EvenStrength => "5v5",
            Situation::FiveOnFour => "5v4",
            Situation::FiveOnThree => "5v3",
            Situation::FourOnFive => "4v5",
            Situation::ThreeOnFive => "3v5",
        }
    }

    pub fn parse(raw: &str) -> Option<Situation> {
        let s = raw.trim().to_ascii_lowercase();
        match s.as_str() {
            "all" | "all situations" | "as" => Some(Situation::All),
            "5v5" | "ev" | "even strength" => Some(Situation::EvenStrength),
            "5v4" => Some(Situation::FiveOnFour),
            "5v3" => Some(Situation::FiveOnThree),
            "4v5" => Some(Situation::FourOnFive),
            "3v5" => Some(Situation::ThreeOnFive),
            _ => None,
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Statistic values for one keyed row. Absent entries are missing data, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    values: BTreeMap<Stat, f64>,
}

impl StatLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stat: Stat) -> Option<f64> {
        self.values.get(&stat).copied()
    }

    pub fn insert(&mut self, stat: Stat, value: f64) {
        self.values.insert(stat, value);
    }

    pub fn remove(&mut self, stat: Stat) -> Option<f64> {
        self.values.remove(&stat)
    }

    pub fn contains(&self, stat: Stat) -> bool {
        self.values.contains_key(&stat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// New line without the given statistics.
    pub fn without(&self, dropped: &[Stat]) -> StatLine {
        StatLine {
            values: self
                .values
                .iter()
                .filter(|(k, _)| !dropped.contains(k))
                .map(|(k, v)| (*k, *v))
                .collect(),
        }
    }

    /// Element-wise sum. A statistic present on only one side counts as zero on the other.
    pub fn add(&self, other: &StatLine) -> StatLine {
        let mut out = self.clone();
        for (stat, value) in other.iter() {
            *out.values.entry(stat).or_insert(0.0) += value;
        }
        out
    }
}

impl FromIterator<(Stat, f64)> for StatLine {
    fn from_iter<I: IntoIterator<Item = (Stat, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_corsica_aliases() {
        assert_eq!(Stat::from_label("iSF"), Some(Stat::Shots));
        assert_eq!(Stat::from_label("iSh%"), Some(Stat::ShootingPct));
        assert_eq!(Stat::from_label("ppg"), Some(Stat::PpGoals));
        assert_eq!(Stat::from_label("CF%"), None);
    }

    #[test]
    fn add_keeps_missing_when_absent_everywhere() {
        let a: StatLine = [(Stat::Goals, 2.0)].into_iter().collect();
        let b: StatLine = [(Stat::Goals, 1.0), (Stat::Assists, 3.0)].into_iter().collect();
        let sum = a.add(&b);
        assert_eq!(sum.get(Stat::Goals), Some(3.0));
        assert_eq!(sum.get(Stat::Assists), Some(3.0));
        assert_eq!(sum.get(Stat::Hits), None);
    }
}
