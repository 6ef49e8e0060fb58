use serde::{Deserialize, Serialize};

pub type CareerId = i64;
pub type PilotId = i64;

/// `career.extends` value marking the first career of a lineage.
pub const ROOT_SENTINEL: CareerId = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CareerRecord {
    pub id: CareerId,
    pub extends: CareerId,
    pub player_id: Option<PilotId>,
}

impl CareerRecord {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.extends == ROOT_SENTINEL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PilotRecord {
    pub id: PilotId,
    pub description: String,
    pub squadron_id: Option<i64>,
    pub rank_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Promotion,
    Award,
    Other,
}

impl EventKind {
    pub const PROMOTION_CODE: i64 = 6;
    pub const AWARD_CODE: i64 = 8;

    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::PROMOTION_CODE => Self::Promotion,
            Self::AWARD_CODE => Self::Award,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct EventRecord {
    pub owner_pilot_id: PilotId,
    pub date: String,
    pub kind: EventKind,
    pub rank_id: Option<i64>,
    pub award_code: Option<String>,
    pub squadron_id: Option<i64>,
}

/// One sortie row with only the kill columns present in the live schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortieRecord {
    pub owner_pilot_id: PilotId,
    pub date: String,
    pub model_path: Option<String>,
    pub mission_id: Option<i64>,
    pub kills: Vec<(String, i64)>,
    pub flight_time_seconds: Option<f64>,
    pub plane_status: Option<i64>,
    pub status: Option<i64>,
}

/// A dynamically typed column value read from a version-dependent table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StatValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    /// Zero numbers and empty text carry no information for display.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Integer(value) => *value == 0,
            Self::Real(value) => value.abs() < f64::EPSILON,
            Self::Text(value) => value.trim().is_empty(),
        }
    }
}

impl From<StatValue> for serde_json::Value {
    fn from(value: StatValue) -> Self {
        match value {
            StatValue::Integer(value) => Self::from(value),
            StatValue::Real(value) => Self::from(value),
            StatValue::Text(value) => Self::from(value),
        }
    }
}

/// A full row in schema column order; `None` marks SQL NULL.
pub type StatRow = Vec<(String, Option<StatValue>)>;
