use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SafetyError;

/// Number of driver stations per alliance.
pub const STATIONS_PER_ALLIANCE: usize = 3;

/// Per-station e-stop flags; index `i` is station `i + 1`. `true` = stopped.
pub type EStops = [bool; STATIONS_PER_ALLIANCE];

// ---------------------------------------------------------------------------
// Alliance
// ---------------------------------------------------------------------------

/// One of the two competing sides on the field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alliance {
    Red,
    Blue,
}

impl Alliance {
    pub const ALL: [Alliance; 2] = [Alliance::Red, Alliance::Blue];

    /// Wire key used by safety units ("red" / "blue").
    pub fn as_str(&self) -> &'static str {
        match self {
            Alliance::Red => "red",
            Alliance::Blue => "blue",
        }
    }

    /// Single-letter prefix of the alliance's station codes.
    pub fn letter(&self) -> char {
        match self {
            Alliance::Red => 'R',
            Alliance::Blue => 'B',
        }
    }

    /// Station codes of this alliance in station order.
    pub fn stations(self) -> [StationCode; STATIONS_PER_ALLIANCE] {
        [1, 2, 3].map(|n| StationCode {
            alliance: self,
            number: n,
        })
    }
}

impl fmt::Display for Alliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alliance {
    type Err = SafetyError;

    /// Exact match only; safety units send lowercase keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Alliance::Red),
            "blue" => Ok(Alliance::Blue),
            other => Err(SafetyError::UnknownAlliance(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StationCode
// ---------------------------------------------------------------------------

/// Arena address of one driver station, rendered as `"R1"` .. `"B3"`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationCode {
    alliance: Alliance,
    number: u8,
}

impl StationCode {
    /// `number` is 1-based and must be within `1..=3`.
    pub fn new(alliance: Alliance, number: u8) -> Result<Self, SafetyError> {
        if (1..=STATIONS_PER_ALLIANCE as u8).contains(&number) {
            Ok(Self { alliance, number })
        } else {
            Err(SafetyError::InvalidStation(format!(
                "{}{}",
                alliance.letter(),
                number
            )))
        }
    }

    pub fn alliance(&self) -> Alliance {
        self.alliance
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Zero-based position in the alliance's e-stop vector.
    pub fn index(&self) -> usize {
        usize::from(self.number - 1)
    }

    /// All six station codes, red first.
    pub fn all() -> impl Iterator<Item = StationCode> {
        Alliance::ALL.into_iter().flat_map(Alliance::stations)
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.alliance.letter(), self.number)
    }
}

impl FromStr for StationCode {
    type Err = SafetyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SafetyError::InvalidStation(s.to_string());
        let mut chars = s.chars();
        let alliance = match chars.next() {
            Some('R') => Alliance::Red,
            Some('B') => Alliance::Blue,
            _ => return Err(invalid()),
        };
        let number = chars
            .as_str()
            .parse::<u8>()
            .map_err(|_| invalid())?;
        StationCode::new(alliance, number).map_err(|_| invalid())
    }
}

impl Serialize for StationCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StationCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AllianceSafetyStatus
// ---------------------------------------------------------------------------

/// Last known state reported by one alliance's safety unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceSafetyStatus {
    /// The unit has reported at least once since boot or last reset.
    pub connected: bool,
    pub estops: EStops,
    /// Time of the last accepted update (boot time until the first one).
    pub last_update: DateTime<Utc>,
}

impl AllianceSafetyStatus {
    /// Boot state: disconnected, no stations stopped.
    pub fn disconnected(now: DateTime<Utc>) -> Self {
        Self {
            connected: false,
            estops: [false; STATIONS_PER_ALLIANCE],
            last_update: now,
        }
    }
}

// ---------------------------------------------------------------------------
// SafetyUpdate
// ---------------------------------------------------------------------------

/// One decoded report from a safety unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyUpdate {
    pub alliance: Alliance,
    pub estops: EStops,
}

impl SafetyUpdate {
    pub fn new(alliance: Alliance, estops: EStops) -> Self {
        Self { alliance, estops }
    }

    /// Translate a raw wire key. Unknown keys surface as
    /// [`SafetyError::UnknownAlliance`].
    pub fn from_raw(alliance: &str, estops: EStops) -> Result<Self, SafetyError> {
        Ok(Self {
            alliance: alliance.parse()?,
            estops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alliance_parse_is_exact() {
        assert_eq!("red".parse::<Alliance>().unwrap(), Alliance::Red);
        assert_eq!("blue".parse::<Alliance>().unwrap(), Alliance::Blue);
        assert_eq!(
            "Red".parse::<Alliance>(),
            Err(SafetyError::UnknownAlliance("Red".to_string()))
        );
        assert!("green".parse::<Alliance>().is_err());
    }

    #[test]
    fn station_codes_render_and_parse() {
        let codes: Vec<String> = StationCode::all().map(|c| c.to_string()).collect();
        assert_eq!(codes, ["R1", "R2", "R3", "B1", "B2", "B3"]);

        let b2: StationCode = "B2".parse().unwrap();
        assert_eq!(b2.alliance(), Alliance::Blue);
        assert_eq!(b2.index(), 1);

        for bad in ["", "R", "R0", "R4", "G1", "r1", "R1x"] {
            assert!(bad.parse::<StationCode>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn station_number_out_of_range_rejected() {
        assert!(StationCode::new(Alliance::Red, 0).is_err());
        assert!(StationCode::new(Alliance::Blue, 4).is_err());
        assert!(StationCode::new(Alliance::Blue, 3).is_ok());
    }
}
