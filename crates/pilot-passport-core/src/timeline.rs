//! Chronological service and sortie histories across every pilot record of a
//! lineage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Date, Time};

use crate::descriptor::reverse_date;
use crate::records::{EventKind, EventRecord, SortieRecord};
use crate::resources::{parse_dotted_date, ResourceResolver};

/// Awards whose name contains this marker are currency grants, not decorations.
const CURRENCY_AWARD_MARKER: &str = "rubles";

const AIRCRAFT_MODEL_SUFFIX: &str = ".txt";
const MISSION_VARIANT_DELIMITER: char = '@';
const MISSION_PHASE_TOKEN: &str = "_p0";

const AIR_KILL_COLUMNS: &[&str] = &["killLightPlane", "killMediumPlane", "killHeavyPlane"];
const GROUND_KILL_COLUMNS: &[&str] = &[
    "killHeavyTank",
    "killMediumTank",
    "killVehicle",
    "killLightTank",
    "killArmouredVehicle",
    "killTruck",
    "killCar",
    "killTrainLocomotive",
    "killTrainVagon",
    "killHowitzer",
    "killFieldGun",
    "killNavalGun",
    "killRocketLauncher",
    "killMachineGun",
    "killSearchlight",
    "killStaticPlane",
    "killAirDefence",
    "killHeavyFlak",
    "killLightFlak",
    "killAAAMachineGun",
];
const NAVAL_KILL_COLUMNS: &[&str] =
    &["killLightShip", "killDestroyerShip", "killSubmarine", "killLargeCargoShip"];
const HUMAN_KILL_COLUMNS: &[&str] =
    &["killPilot", "killPlaneGunner", "killDriver", "killVehicleGunner", "killInfantry"];
const ASSIST_COLUMN: &str = "killAssist";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PromotionEntry {
    pub date: String,
    pub rank_id: i64,
    pub rank_name: String,
    pub rank_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AwardEntry {
    pub date: String,
    pub award_code: String,
    pub award_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ServiceTimeline {
    pub promotions: Vec<PromotionEntry>,
    pub awards: Vec<AwardEntry>,
}

/// Split a stored `year.month.day[ time]` timestamp into its display form
/// (`day.month.year`) and the date-only form used for rule checks.
#[must_use]
pub fn format_event_date(raw: &str) -> (String, String) {
    let date = raw.split_whitespace().next().unwrap_or_default();
    (reverse_date(date), date.to_string())
}

/// Calendar date, then time of day, then the raw text. Neither part is zero
/// padded in the store, so `9:00:00` must compare as a time, not as text.
fn chronological_key(raw: &str) -> (Option<Date>, Option<Time>, &str) {
    let mut tokens = raw.split_whitespace();
    let date = tokens.next().and_then(parse_dotted_date);
    let clock = tokens.next().and_then(parse_clock);
    (date, clock, raw)
}

/// `H:M[:S]` without zero padding.
fn parse_clock(token: &str) -> Option<Time> {
    let mut parts = token.splitn(3, ':');
    let mut field = || parts.next().map(|part| part.parse::<u8>().ok());
    let hour = field()??;
    let minute = field()??;
    let second = field().unwrap_or(Some(0))?;
    Time::from_hms(hour, minute, second).ok()
}

/// Promotions and decorations in ascending date order.
#[must_use]
pub fn build_service_timeline(
    events: &[EventRecord],
    country: Option<u32>,
    resolver: &ResourceResolver,
) -> ServiceTimeline {
    let mut ordered = events.iter().collect::<Vec<_>>();
    ordered.sort_by(|lhs, rhs| chronological_key(&lhs.date).cmp(&chronological_key(&rhs.date)));

    let mut timeline = ServiceTimeline::default();
    for event in ordered {
        let (display_date, check_date) = format_event_date(&event.date);
        match event.kind {
            EventKind::Promotion => {
                let Some(rank_id) = event.rank_id else {
                    continue;
                };
                timeline.promotions.push(PromotionEntry {
                    date: display_date,
                    rank_id,
                    rank_name: resolver.rank_name(country, rank_id),
                    rank_image: resolver.rank_image(country, rank_id, Some(&check_date)),
                });
            }
            EventKind::Award => {
                let Some(code) = event.award_code.as_deref().filter(|code| !code.is_empty()) else {
                    continue;
                };
                let name = resolver.award_name(code);
                if name.to_lowercase().contains(CURRENCY_AWARD_MARKER) {
                    continue;
                }
                timeline.awards.push(AwardEntry {
                    date: display_date,
                    award_code: code.to_string(),
                    award_name: name,
                });
            }
            EventKind::Other => {}
        }
    }
    timeline
}

/// Kill columns grouped into semantic buckets, limited to the columns present
/// in the live `sortie` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct KillColumnPlan {
    pub air: Vec<String>,
    pub ground: Vec<String>,
    pub naval: Vec<String>,
    pub human: Vec<String>,
    pub assist: Option<String>,
}

impl KillColumnPlan {
    #[must_use]
    pub fn from_columns(available: &[String]) -> Self {
        let present = |bucket: &[&str]| {
            bucket
                .iter()
                .filter(|column| available.iter().any(|name| name.as_str() == **column))
                .map(|column| (*column).to_string())
                .collect::<Vec<_>>()
        };
        Self {
            air: present(AIR_KILL_COLUMNS),
            ground: present(GROUND_KILL_COLUMNS),
            naval: present(NAVAL_KILL_COLUMNS),
            human: present(HUMAN_KILL_COLUMNS),
            assist: available.iter().find(|name| *name == ASSIST_COLUMN).cloned(),
        }
    }

    /// Every planned column, bucket by bucket.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.air
            .iter()
            .chain(&self.ground)
            .chain(&self.naval)
            .chain(&self.human)
            .chain(&self.assist)
            .map(String::as_str)
            .collect()
    }

    fn labelled_buckets(&self) -> [(&'static str, Vec<&str>); 5] {
        fn names(bucket: &[String]) -> Vec<&str> {
            bucket.iter().map(String::as_str).collect()
        }
        [
            ("Air kills", names(&self.air)),
            ("Ground target kills", names(&self.ground)),
            ("Naval kills", names(&self.naval)),
            ("Human kills", names(&self.human)),
            ("Kill assist", self.assist.iter().map(String::as_str).collect()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortieSummary {
    pub date: String,
    pub aircraft: String,
    pub mission_type: String,
    /// Non-zero buckets in air, ground, naval, human, assist order.
    pub kills: Map<String, Value>,
    pub flight_time: String,
    pub plane_status: Option<i64>,
    pub status: Option<i64>,
}

#[must_use]
pub fn summarize_sortie(
    record: &SortieRecord,
    plan: &KillColumnPlan,
    mission_template: Option<&str>,
) -> SortieSummary {
    let count = |column: &str| {
        record.kills.iter().filter(|(name, _)| name == column).map(|(_, value)| *value).sum::<i64>()
    };

    let mut kills = Map::new();
    for (label, columns) in plan.labelled_buckets() {
        let total = columns.into_iter().map(count).sum::<i64>();
        if total != 0 {
            kills.insert(label.to_string(), Value::from(total));
        }
    }

    SortieSummary {
        date: record.date.clone(),
        aircraft: record.model_path.as_deref().map(aircraft_name).unwrap_or_default(),
        mission_type: mission_template.map(mission_type_name).unwrap_or_default(),
        kills,
        flight_time: format_sortie_flight_time(record.flight_time_seconds),
        plane_status: record.plane_status,
        status: record.status,
    }
}

/// Sort sortie rows into ascending date order in place.
pub fn order_sorties(records: &mut [SortieRecord]) {
    records.sort_by(|lhs, rhs| chronological_key(&lhs.date).cmp(&chronological_key(&rhs.date)));
}

/// `LuaScripts/WorldObjects/Planes/yak1s69.txt` -> `YAK1S69`.
#[must_use]
pub fn aircraft_name(model_path: &str) -> String {
    let base = model_path.rsplit('/').next().unwrap_or(model_path);
    base.strip_suffix(AIRCRAFT_MODEL_SUFFIX).unwrap_or(base).to_uppercase()
}

/// `dogfight_p0something` -> `Dogfight`, `free-hunt@variant2` -> `Free Hunt`.
#[must_use]
pub fn mission_type_name(template: &str) -> String {
    let head = match template.split_once(MISSION_VARIANT_DELIMITER) {
        Some((head, _)) => head,
        None => template.find(MISSION_PHASE_TOKEN).map_or(template, |index| &template[..index]),
    };
    head.replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Compact per-sortie duration: `1h 1m`, `2h`, or `0m`; empty when unknown.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_sortie_flight_time(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return String::new();
    };
    let hours = (seconds / 3600.0).floor() as i64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as i64;
    match (hours > 0, minutes > 0) {
        (true, true) => format!("{hours}h {minutes}m"),
        (true, false) => format!("{hours}h"),
        _ => format!("{minutes}m"),
    }
}
