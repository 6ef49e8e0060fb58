//! Identity fields embedded in a pilot's `description` text.
//!
//! The descriptor is an `&`-separated blob written by the game, e.g.
//! `fullname=John%20Doe&birthCountryInfo=101&birthDate=1920.5.3`. Parsing never
//! fails: every field that cannot be found degrades to a fixed default.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

static FULLNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"fullname=([^&]+)").ok());
static COUNTRY_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"birthCountryInfo=(\d+)").ok());
static BIRTH_DATE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"birthDate=([\d.]+)").ok());

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PilotDescriptor {
    pub full_name: String,
    pub birth_country: Option<u32>,
    pub birth_date: String,
}

impl PilotDescriptor {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            full_name: extract_full_name(raw),
            birth_country: extract_birth_country(raw),
            birth_date: extract_birth_date(raw),
        }
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name.split_once(' ').map_or(self.full_name.as_str(), |(first, _)| first)
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        self.full_name.split_once(' ').map_or("", |(_, last)| last)
    }

    #[must_use]
    pub fn country_name(&self) -> &'static str {
        country_name(self.birth_country)
    }
}

#[must_use]
pub fn country_name(code: Option<u32>) -> &'static str {
    match code {
        Some(101) => "Soviet Union",
        Some(102) => "Great Britain",
        Some(103) => "United States of America",
        Some(201) => "Germany",
        _ => UNKNOWN,
    }
}

fn capture<'a>(re: Option<&Regex>, raw: &'a str) -> Option<&'a str> {
    re?.captures(raw).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

fn extract_full_name(raw: &str) -> String {
    capture((*FULLNAME_RE).as_ref(), raw)
        .map_or_else(|| UNKNOWN.to_string(), |name| name.replace("%20", " "))
}

fn extract_birth_country(raw: &str) -> Option<u32> {
    capture((*COUNTRY_RE).as_ref(), raw).and_then(|code| code.parse().ok())
}

fn extract_birth_date(raw: &str) -> String {
    capture((*BIRTH_DATE_RE).as_ref(), raw).map(reverse_date).unwrap_or_default()
}

/// Reorder a `year.month.day` value into `day.month.year`. Anything that does not
/// split into exactly three components is returned unchanged.
#[must_use]
pub fn reverse_date(raw: &str) -> String {
    let parts = raw.split('.').collect::<Vec<_>>();
    match parts.as_slice() {
        [year, month, day] => format!("{day}.{month}.{year}"),
        _ => raw.to_string(),
    }
}
