//! Career statistics report built from whatever columns the live `pilot` table
//! has. Column names are turned into display labels and emitted in a fixed
//! canonical order, with unknown columns appended in schema order.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};

use crate::records::{StatRow, StatValue};

pub const FLIGHT_TIME: &str = "Flight Time";
pub const GOOD_SORTIES: &str = "Good Sorties";
pub const SORTIES: &str = "Sorties";
pub const SUCCESS_RATE: &str = "Success Rate";

/// Display order consumed by downstream report renderers.
pub const STAT_DISPLAY_ORDER: &[&str] = &[
    FLIGHT_TIME,
    GOOD_SORTIES,
    SORTIES,
    SUCCESS_RATE,
    "Light Fighter",
    "Light Attack Plane",
    "Light Bomber",
    "Light Recon",
    "Light Transport",
    "Medium Fighter",
    "Medium Attack Plane",
    "Medium Bomber",
    "Medium Recon",
    "Medium Transport",
    "Heavy Fighter",
    "Heavy Attack Plane",
    "Heavy Bomber",
    "Heavy Recon",
    "Heavy Transport",
    "Heavy Armoured",
    "Heavy Tank",
    "Medium Tank",
    "Vehicle",
    "Light Tank",
    "Armoured Vehicle",
    "Truck",
    "Car",
    "Train Locomotive",
    "Train Vagon",
    "Howitzer",
    "Field Gun",
    "Naval Gun",
    "Rocket Launcher",
    "Machine Gun",
    "Searchlight",
    "Static Plane",
    "Air Defence",
    "Heavy Flak",
    "Light Flak",
    "AAA Machine Gun",
    "Ships",
    "Light Ship",
    "Destroyer Ship",
    "Submarine",
    "Large Cargo Ship",
    "Building",
    "Rural Yard",
    "Town Building",
    "Factory Building",
    "Railway Station Facility",
    "Bridge",
    "Airfield Facility",
    "Air Crew",
    "Pilot",
    "Plane Gunner",
    "Driver",
    "Vehicle Gunner",
    "Infantry",
    "Turrets",
    "Plane Turrets",
    "Vehicle Turrets",
    "Plane In Group",
    "Assist",
];

/// Identity, bookkeeping and aggregate plane columns that never appear as stats.
const EXCLUDED_COLUMNS: &[&str] = &[
    "description",
    "id",
    "name",
    "lastName",
    "personageId",
    "avatarPath",
    "birthDay",
    "isDeleted",
    "penalty",
    "penaltyPot",
    "pcp",
    "squadronId",
    "rankId",
    "state",
    "stateDate",
    "statePeriod",
    "trainPot",
    "vehPot",
    "shipPot",
    "buildingPot",
    "score",
    "transferProb",
    "wounded",
    "nickname",
    "deathDate",
    "bioInfo",
    "startDate",
    "playerCountryId",
    "startSquadronInfo",
    "virtualSquadronId",
    "playerPremiumStatus",
    "startRankInfo",
    "careerStartDate",
    "insDate",
    "killLightPlane",
    "killMediumPlane",
    "killHeavyPlane",
    "sorties",
    "goodSorties",
    "success_rate",
];

static ABBREVIATION_BOUNDARY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"([A-Z]{2,})([A-Z][a-z])").ok());
static CAMEL_BOUNDARY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").ok());

/// `killAAAMachineGun` -> `AAA Machine Gun`, `flightTime` -> `Flight Time`.
#[must_use]
pub fn friendly_label(column: &str) -> String {
    let mut label = match column.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("kill") => column[4..].to_string(),
        _ => column.to_string(),
    };
    for re in [&*ABBREVIATION_BOUNDARY_RE, &*CAMEL_BOUNDARY_RE].into_iter().flatten() {
        label = re.replace_all(&label, "${1} ${2}").into_owned();
    }
    label.split_whitespace().map(label_word).collect::<Vec<_>>().join(" ")
}

fn label_word(word: &str) -> String {
    let is_abbreviation = word.chars().count() > 1
        && word.chars().any(char::is_uppercase)
        && !word.chars().any(char::is_lowercase);
    if is_abbreviation {
        return word.to_string();
    }
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Whole hours and minutes, always both segments: `3661` -> `1h 1m`, `59` -> `0h 0m`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_stat_flight_time(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor() as i64;
    let minutes = ((seconds % 3600.0) / 60.0).floor() as i64;
    format!("{hours}h {minutes}m")
}

/// Percentage of good sorties with one decimal; `0.0%` when there were no sorties.
#[must_use]
pub fn success_rate(good: f64, total: f64) -> String {
    if total == 0.0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", good / total * 100.0)
}

/// Build the ordered label -> value report for one pilot row.
#[must_use]
pub fn build_stat_report(row: &StatRow) -> Map<String, Value> {
    let lookup = |column: &str| {
        row.iter().find(|(name, _)| name == column).and_then(|(_, value)| value.as_ref())
    };
    let numeric = |column: &str| lookup(column).and_then(StatValue::as_f64).unwrap_or(0.0);

    let mut labelled = Map::new();
    for (column, value) in row {
        if EXCLUDED_COLUMNS.contains(&column.as_str()) {
            continue;
        }
        let Some(value) = value.as_ref().filter(|value| !value.is_blank()) else {
            continue;
        };
        labelled.insert(friendly_label(column), Value::from(value.clone()));
    }

    let mut report = Map::new();
    let flight_time = numeric("flightTime");
    if flight_time != 0.0 {
        report.insert(FLIGHT_TIME.to_string(), Value::from(format_stat_flight_time(flight_time)));
    }
    for (label, column) in [(GOOD_SORTIES, "goodSorties"), (SORTIES, "sorties")] {
        let value = lookup(column).cloned().map_or_else(|| Value::from(0), Value::from);
        report.insert(label.to_string(), value);
    }
    report.insert(
        SUCCESS_RATE.to_string(),
        Value::from(success_rate(numeric("goodSorties"), numeric("sorties"))),
    );

    for label in STAT_DISPLAY_ORDER {
        if report.contains_key(*label) {
            continue;
        }
        if let Some(value) = labelled.get(*label) {
            report.insert((*label).to_string(), value.clone());
        }
    }
    for (label, value) in labelled {
        if !report.contains_key(&label) {
            report.insert(label, value);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(column: &str, value: i64) -> (String, Option<StatValue>) {
        (column.to_string(), Some(StatValue::Integer(value)))
    }

    fn keys(report: &Map<String, Value>) -> Vec<&str> {
        report.keys().map(String::as_str).collect()
    }

    #[test]
    fn labels_split_camel_case_and_keep_abbreviations() {
        assert_eq!(friendly_label("killHeavyTank"), "Heavy Tank");
        assert_eq!(friendly_label("killAAAMachineGun"), "AAA Machine Gun");
        assert_eq!(friendly_label("killPlaneInGroup"), "Plane In Group");
        assert_eq!(friendly_label("KillAssist"), "Assist");
        assert_eq!(friendly_label("flightTime"), "Flight Time");
        assert_eq!(friendly_label("bailouts"), "Bailouts");
        assert_eq!(friendly_label("kil"), "Kil");
    }

    #[test]
    fn flight_time_uses_hours_and_minutes() {
        assert_eq!(format_stat_flight_time(3661.0), "1h 1m");
        assert_eq!(format_stat_flight_time(59.0), "0h 0m");
        assert_eq!(format_stat_flight_time(36_000.0), "10h 0m");
    }

    #[test]
    fn success_rate_avoids_division_by_zero() {
        assert_eq!(success_rate(0.0, 0.0), "0.0%");
        assert_eq!(success_rate(3.0, 4.0), "75.0%");
        assert_eq!(success_rate(1.0, 3.0), "33.3%");
    }

    #[test]
    fn headline_fields_come_first_in_fixed_order() {
        let row = vec![
            int("id", 7),
            int("killHeavyTank", 2),
            int("sorties", 4),
            int("goodSorties", 3),
            int("flightTime", 3661),
        ];

        let report = build_stat_report(&row);

        assert_eq!(keys(&report), vec![FLIGHT_TIME, GOOD_SORTIES, SORTIES, SUCCESS_RATE, "Heavy Tank"]);
        assert_eq!(report.get(FLIGHT_TIME), Some(&Value::from("1h 1m")));
        assert_eq!(report.get(SUCCESS_RATE), Some(&Value::from("75.0%")));
        assert_eq!(report.get(GOOD_SORTIES), Some(&Value::from(3)));
    }

    #[test]
    fn zero_and_absent_values_are_omitted() {
        let row = vec![
            int("killLightFighter", 0),
            ("killTruck".to_string(), None),
            ("killCar".to_string(), Some(StatValue::Real(0.0))),
            ("nicknameText".to_string(), Some(StatValue::Text("  ".to_string()))),
            int("killBridge", 1),
        ];

        let report = build_stat_report(&row);

        assert_eq!(keys(&report), vec![GOOD_SORTIES, SORTIES, SUCCESS_RATE, "Bridge"]);
        assert_eq!(report.get(SORTIES), Some(&Value::from(0)));
        assert_eq!(report.get(SUCCESS_RATE), Some(&Value::from("0.0%")));
    }

    #[test]
    fn canonical_order_wins_and_unknown_columns_follow_in_schema_order() {
        let row = vec![
            int("bailouts", 2),
            int("killAssist", 5),
            int("killTruck", 1),
            int("killLightFighter", 3),
            int("ditchings", 1),
            int("killLightPlane", 9),
            int("rankId", 4),
        ];

        let report = build_stat_report(&row);

        assert_eq!(
            keys(&report),
            vec![
                GOOD_SORTIES,
                SORTIES,
                SUCCESS_RATE,
                "Light Fighter",
                "Truck",
                "Assist",
                "Bailouts",
                "Ditchings"
            ]
        );
    }
}
