//! Display names and images for numeric game codes, searched across an ordered
//! list of resource sources (mod override first, stock assets second).
//!
//! A missing file and a missing field are both ordinary negative results: the
//! search moves on to the next source and finally to a fixed default.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::descriptor::UNKNOWN;

pub const PLACEHOLDER_IMAGE: &str = "/static/images/award_placeholder.png";

const SOVIET_UNION: u32 = 101;
const UNITED_STATES: u32 = 103;
const DEFAULT_RANK_IMAGE: &str = "big.png";
const SOVIET_1943_RANK_IMAGE: &str = "big.1943.png";
const UNITED_STATES_RANK_IMAGE: &str = "medium.png";

static NAME_FIELD_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"&name\s*=\s*"([^"]+)""#).ok());

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Rank,
    Award,
    Squadron,
}

/// One location holding locale text and images keyed by category and key.
pub trait ResourceSource: Send + Sync {
    /// Short name used in log output.
    fn label(&self) -> &str;

    /// Raw locale text for `key`, or `None` when this source has no such resource.
    fn locale_text(&self, category: ResourceCategory, key: &str) -> Option<String>;

    /// Public reference to the image `file_name` under `key`, if it exists here.
    fn image(&self, category: ResourceCategory, key: &str, file_name: &str) -> Option<String>;
}

pub struct ResourceResolver {
    sources: Vec<Box<dyn ResourceSource>>,
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("sources", &self.sources.iter().map(|source| source.label()).collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceResolver {
    /// Sources are searched in the given order; the first hit wins.
    #[must_use]
    pub fn new(sources: Vec<Box<dyn ResourceSource>>) -> Self {
        Self { sources }
    }

    fn first_text<T>(
        &self,
        category: ResourceCategory,
        key: &str,
        extract: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        self.sources
            .iter()
            .filter_map(|source| source.locale_text(category, key))
            .find_map(|text| extract(&text))
    }

    fn first_image(&self, category: ResourceCategory, key: &str, file_name: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.image(category, key, file_name))
    }

    #[must_use]
    pub fn rank_name(&self, country: Option<u32>, rank_id: i64) -> String {
        rank_key(country, rank_id)
            .and_then(|key| self.first_text(ResourceCategory::Rank, &key, name_field))
            .unwrap_or_else(|| format!("Rank {rank_id}"))
    }

    /// `event_date` is the `year.month.day` date of the promotion, when known.
    #[must_use]
    pub fn rank_image(&self, country: Option<u32>, rank_id: i64, event_date: Option<&str>) -> String {
        let Some(country_code) = country else {
            return PLACEHOLDER_IMAGE.to_string();
        };
        let Some(key) = rank_key(country, rank_id) else {
            return PLACEHOLDER_IMAGE.to_string();
        };
        let file_name = rank_image_file(country_code, event_date);
        self.first_image(ResourceCategory::Rank, &key, file_name)
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
    }

    /// Unknown award codes are displayed as the code itself.
    #[must_use]
    pub fn award_name(&self, code: &str) -> String {
        self.first_text(ResourceCategory::Award, code, name_field)
            .unwrap_or_else(|| code.to_string())
    }

    #[must_use]
    pub fn squadron_short_name(&self, config_id: Option<i64>) -> String {
        config_id
            .and_then(|id| {
                self.first_text(ResourceCategory::Squadron, &id.to_string(), squadron_short_name)
            })
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

fn rank_key(country: Option<u32>, rank_id: i64) -> Option<String> {
    let country = i64::from(country?);
    country.checked_mul(1000)?.checked_add(rank_id).map(|key| key.to_string())
}

/// Image file for a rank insignia. Soviet insignia changed on 1943-01-01 and the
/// US set only ships a medium-sized variant.
#[must_use]
pub fn rank_image_file(country: u32, event_date: Option<&str>) -> &'static str {
    match country {
        SOVIET_UNION if event_date.and_then(parse_dotted_date).is_some_and(is_after_1943_reform) => {
            SOVIET_1943_RANK_IMAGE
        }
        UNITED_STATES => UNITED_STATES_RANK_IMAGE,
        _ => DEFAULT_RANK_IMAGE,
    }
}

fn is_after_1943_reform(date: Date) -> bool {
    Date::from_calendar_date(1943, Month::January, 1).is_ok_and(|cutoff| date >= cutoff)
}

/// Parse a `year.month.day` date with arbitrary-width components.
#[must_use]
pub fn parse_dotted_date(raw: &str) -> Option<Date> {
    let mut parts = raw.trim().split('.');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

fn name_field(text: &str) -> Option<String> {
    let re = (*NAME_FIELD_RE).as_ref()?;
    text.lines()
        .filter(|line| line.contains("&name"))
        .find_map(|line| re.captures(line).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
}

/// Squadron locale files list `*`-prefixed records whose last comma-separated
/// field is the quoted short name.
fn squadron_short_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('*'))
        .find_map(|line| {
            let fields = line.trim_matches('|').split(',').collect::<Vec<_>>();
            if fields.len() >= 3 {
                fields.last().map(|field| unquote(field))
            } else {
                None
            }
        })
}

fn unquote(field: &str) -> String {
    field.trim().trim_matches('"').to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MapSource {
        pub label: String,
        pub texts: BTreeMap<(ResourceCategory, String), String>,
        pub images: BTreeMap<(ResourceCategory, String, String), String>,
    }

    impl MapSource {
        pub(crate) fn named(label: &str) -> Self {
            Self { label: label.to_string(), ..Self::default() }
        }

        pub(crate) fn text(mut self, category: ResourceCategory, key: &str, body: &str) -> Self {
            self.texts.insert((category, key.to_string()), body.to_string());
            self
        }

        pub(crate) fn image(mut self, category: ResourceCategory, key: &str, file: &str) -> Self {
            let url = format!("/{}/{key}/{file}", self.label);
            self.images.insert((category, key.to_string(), file.to_string()), url);
            self
        }
    }

    impl ResourceSource for MapSource {
        fn label(&self) -> &str {
            &self.label
        }

        fn locale_text(&self, category: ResourceCategory, key: &str) -> Option<String> {
            self.texts.get(&(category, key.to_string())).cloned()
        }

        fn image(&self, category: ResourceCategory, key: &str, file_name: &str) -> Option<String> {
            self.images.get(&(category, key.to_string(), file_name.to_string())).cloned()
        }
    }

    fn resolver(sources: Vec<MapSource>) -> ResourceResolver {
        ResourceResolver::new(
            sources.into_iter().map(|source| Box::new(source) as Box<dyn ResourceSource>).collect(),
        )
    }

    #[test]
    fn mod_rank_name_overrides_stock() {
        let resolver = resolver(vec![
            MapSource::named("mod").text(ResourceCategory::Rank, "101003", "&name=\"Starshina\""),
            MapSource::named("stock").text(ResourceCategory::Rank, "101003", "&name=\"Sergeant\""),
        ]);

        assert_eq!(resolver.rank_name(Some(101), 3), "Starshina");
    }

    #[test]
    fn rank_name_falls_through_sources_missing_the_field() {
        let resolver = resolver(vec![
            MapSource::named("mod").text(ResourceCategory::Rank, "201002", "&desc=\"no name\""),
            MapSource::named("stock")
                .text(ResourceCategory::Rank, "201002", "header\n&name = \"Leutnant\"\n"),
        ]);

        assert_eq!(resolver.rank_name(Some(201), 2), "Leutnant");
    }

    #[test]
    fn rank_without_resources_gets_synthesized_name_and_placeholder() {
        let resolver = resolver(vec![MapSource::named("stock")]);

        assert_eq!(resolver.rank_name(Some(102), 7), "Rank 7");
        assert_eq!(resolver.rank_name(None, 7), "Rank 7");
        assert_eq!(resolver.rank_image(Some(102), 7, None), PLACEHOLDER_IMAGE);
        assert_eq!(resolver.rank_image(None, 7, Some("1944.1.1")), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn rank_image_prefers_mod_then_stock() {
        let resolver = resolver(vec![
            MapSource::named("mod").image(ResourceCategory::Rank, "201001", "big.png"),
            MapSource::named("stock")
                .image(ResourceCategory::Rank, "201001", "big.png")
                .image(ResourceCategory::Rank, "201002", "big.png"),
        ]);

        assert_eq!(resolver.rank_image(Some(201), 1, None), "/mod/201001/big.png");
        assert_eq!(resolver.rank_image(Some(201), 2, None), "/stock/201002/big.png");
    }

    #[test]
    fn soviet_insignia_switch_on_1943_reform_date() {
        assert_eq!(rank_image_file(101, Some("1942.12.31")), "big.png");
        assert_eq!(rank_image_file(101, Some("1943.1.1")), "big.1943.png");
        assert_eq!(rank_image_file(101, Some("1944.06.22")), "big.1943.png");
        assert_eq!(rank_image_file(101, Some("not a date")), "big.png");
        assert_eq!(rank_image_file(101, None), "big.png");
    }

    #[test]
    fn us_insignia_always_use_medium_image() {
        assert_eq!(rank_image_file(103, Some("1941.1.1")), "medium.png");
        assert_eq!(rank_image_file(103, Some("1945.1.1")), "medium.png");
        assert_eq!(rank_image_file(201, Some("1945.1.1")), "big.png");
    }

    #[test]
    fn award_name_falls_back_to_code() {
        let resolver = resolver(vec![MapSource::named("stock").text(
            ResourceCategory::Award,
            "order_lenin",
            "&type=1\n&name=\"Order of Lenin\"",
        )]);

        assert_eq!(resolver.award_name("order_lenin"), "Order of Lenin");
        assert_eq!(resolver.award_name("missing_award"), "missing_award");
    }

    #[test]
    fn squadron_short_name_reads_last_field_of_marked_line() {
        let resolver = resolver(vec![MapSource::named("stock")
            .text(
                ResourceCategory::Squadron,
                "10",
                "// header\n*1,\"Full Regiment Name\",\"16 GIAP\"|\n",
            )
            .text(ResourceCategory::Squadron, "11", "*2, \"Jagdgeschwader 52\", \"JG 52\"||")
            .text(ResourceCategory::Squadron, "12", "*broken line\n")]);

        assert_eq!(resolver.squadron_short_name(Some(10)), "16 GIAP");
        assert_eq!(resolver.squadron_short_name(Some(11)), "JG 52");
        assert_eq!(resolver.squadron_short_name(Some(12)), UNKNOWN);
        assert_eq!(resolver.squadron_short_name(Some(13)), UNKNOWN);
        assert_eq!(resolver.squadron_short_name(None), UNKNOWN);
    }
}
