//! Layout metadata: the Zone → Aisle → Rack → Level hierarchy.
//!
//! These are plain value types used during layout setup to compose location
//! codes; the running system addresses everything by [`LocationCode`].

use serde::{Deserialize, Serialize};

use wareflow_core::{DomainError, DomainResult, LocationCode};

/// Named area of the warehouse (chilled, ambient, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub description: String,
}

impl Zone {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::validation("zone name must not be empty"));
        }
        Ok(Self {
            name,
            description: description.into(),
        })
    }

    /// Start an aisle in this zone, identified by letters only.
    pub fn aisle(&self, letter: impl Into<String>) -> DomainResult<Aisle> {
        let letter = letter.into();
        if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "aisle letter must be letters only: {letter:?}"
            )));
        }
        Ok(Aisle {
            zone: self.name.clone(),
            letter: letter.to_ascii_uppercase(),
        })
    }
}

/// Aisle within a zone, identified by letters only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aisle {
    pub zone: String,
    pub letter: String,
}

/// Rack within an aisle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rack {
    pub number: u32,
}

/// Level within a rack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Ground,
    One,
    Two,
    Three,
    Four,
}

impl Level {
    pub fn code_char(self) -> char {
        match self {
            Level::Ground => 'G',
            Level::One => '1',
            Level::Two => '2',
            Level::Three => '3',
            Level::Four => '4',
        }
    }
}

/// Side of an aisle a slot faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    East,
    West,
    North,
    South,
}

impl Side {
    pub fn code_char(self) -> char {
        match self {
            Side::East => 'E',
            Side::West => 'W',
            Side::North => 'N',
            Side::South => 'S',
        }
    }
}

/// Compose the canonical location code for a racking slot,
/// e.g. aisle A, rack 1, ground level, east side, slot 4 → "A-01-G-E-04".
pub fn compose_code(
    aisle: &Aisle,
    rack: &Rack,
    level: Level,
    side: Side,
    slot_number: u32,
) -> DomainResult<LocationCode> {
    LocationCode::new(format!(
        "{}-{:02}-{}-{}-{:02}",
        aisle.letter,
        rack.number,
        level.code_char(),
        side.code_char(),
        slot_number
    ))
}
