//! The four passport operations over a configured game installation.
//!
//! Every operation opens its own read-only connection to the career database
//! and drops it before returning, so no handle outlives a request while the
//! game process keeps writing the file.

mod config;
mod error;

use std::collections::BTreeMap;
use std::path::PathBuf;

use pilot_passport_core::{
    build_service_timeline, build_stat_report, order_sorties, summarize_sortie, AwardEntry,
    CareerGraph, CareerId, Lineage, PilotDescriptor, PilotId, PromotionEntry, ResourceResolver,
    ResourceSource, SortieSummary, UNKNOWN,
};
use pilot_passport_resources::DirectorySource;
use pilot_passport_store_sqlite::SqliteStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub use config::{PassportConfig, PassportPaths, DEFAULT_STATIC_ROOT};
pub use error::PassportError;

pub const API_CONTRACT_VERSION: &str = "api.v1";

pub type PassportResult<T> = Result<T, PassportError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    /// Raw descriptor of the lineage's current pilot row; the lookup key for
    /// every other operation.
    pub desc: String,
    pub display: String,
    pub country: String,
    pub squadron: String,
    pub pilot_id: PilotId,
    pub root_career_id: CareerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PilotInfo {
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub birth_country: String,
    pub pilot_id: PilotId,
    pub squadron: String,
    pub rank_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRecord {
    pub pilot_info: PilotInfo,
    pub promotions: Vec<PromotionEntry>,
    pub awards: Vec<AwardEntry>,
}

/// A lineage resolved from a descriptor, with the pilot rows it spans.
struct ResolvedPilot {
    lineage: Lineage,
    pilot_ids: Vec<PilotId>,
    tip_pilot_id: PilotId,
}

#[derive(Debug, Clone)]
pub struct PilotPassportApi {
    paths: PassportPaths,
}

impl PilotPassportApi {
    #[must_use]
    pub fn new(paths: PassportPaths) -> Self {
        Self { paths }
    }

    #[must_use]
    pub fn paths(&self) -> &PassportPaths {
        &self.paths
    }

    fn open_store(&self) -> PassportResult<SqliteStore> {
        let Some(db_path) = self.paths.db_path.as_ref() else {
            return Err(PassportError::SourceUnavailable {
                path: PathBuf::new(),
                reason: "no game path or database configured".to_string(),
            });
        };
        if !db_path.is_file() {
            return Err(PassportError::SourceUnavailable {
                path: db_path.clone(),
                reason: "file not found".to_string(),
            });
        }
        SqliteStore::open_read_only(db_path).map_err(|err| PassportError::SourceUnavailable {
            path: db_path.clone(),
            reason: format!("{err:#}"),
        })
    }

    /// Mod rank overrides first, stock resources second.
    fn resolver(&self) -> ResourceResolver {
        let mut sources: Vec<Box<dyn ResourceSource>> = Vec::with_capacity(2);
        if let Some(dir) = self.paths.mod_ranks_dir.as_deref() {
            sources.push(Box::new(DirectorySource::mod_ranks(dir)));
        }
        sources.push(Box::new(DirectorySource::stock(&self.paths.static_root)));
        ResourceResolver::new(sources)
    }

    /// One entry per root career, described by the lineage's current pilot.
    ///
    /// # Errors
    /// Returns [`PassportError::SourceUnavailable`] when the database cannot be
    /// opened and [`PassportError::Store`] when a query fails.
    pub fn resolve_pilot_roster(&self) -> PassportResult<Vec<RosterEntry>> {
        let store = self.open_store()?;
        let resolver = self.resolver();
        let graph = CareerGraph::new(store.list_careers()?);

        let mut roster = Vec::new();
        for root in graph.roots() {
            let lineage = match graph.resolve(root.id) {
                Ok(lineage) => lineage,
                Err(err) => {
                    warn!(root_career_id = root.id, error = %err, "skipping unresolvable lineage");
                    continue;
                }
            };
            warn_if_ambiguous(&lineage);
            let Some(tip_pilot_id) = graph.tip_pilot_id(&lineage) else {
                debug!(root_career_id = root.id, tip = lineage.tip, "tip career has no pilot");
                continue;
            };
            let Some(pilot) = store.load_pilot(tip_pilot_id)? else {
                debug!(root_career_id = root.id, tip_pilot_id, "tip pilot row missing");
                continue;
            };

            let descriptor = PilotDescriptor::parse(&pilot.description);
            roster.push(RosterEntry {
                display: descriptor.full_name.clone(),
                country: descriptor.country_name().to_string(),
                squadron: squadron_name(&store, &resolver, pilot.squadron_id)?,
                pilot_id: tip_pilot_id,
                root_career_id: root.id,
                desc: pilot.description,
            });
        }

        info!(careers = graph.len(), pilots = roster.len(), "resolved pilot roster");
        Ok(roster)
    }

    /// Identity summary of the current pilot plus every promotion and award
    /// across the lineage.
    ///
    /// # Errors
    /// Returns [`PassportError::NotFound`] when `descriptor` matches no pilot,
    /// [`PassportError::SourceUnavailable`] when the database cannot be opened,
    /// and [`PassportError::Lineage`] when the career chain is corrupt.
    pub fn resolve_service_record(&self, descriptor: &str) -> PassportResult<ServiceRecord> {
        let store = self.open_store()?;
        let resolver = self.resolver();
        let resolved = resolve_pilot(&store, descriptor)?;
        let Some(tip) = store.load_pilot(resolved.tip_pilot_id)? else {
            return Err(PassportError::NotFound(descriptor.to_string()));
        };

        let identity = PilotDescriptor::parse(&tip.description);
        let country = identity.birth_country;
        let pilot_info = PilotInfo {
            first_name: identity.first_name().to_string(),
            last_name: identity.last_name().to_string(),
            birth_country: identity.country_name().to_string(),
            pilot_id: tip.id,
            squadron: squadron_name(&store, &resolver, tip.squadron_id)?,
            rank_name: tip
                .rank_id
                .map_or_else(|| UNKNOWN.to_string(), |rank_id| resolver.rank_name(country, rank_id)),
            full_name: identity.full_name,
            birth_date: identity.birth_date,
        };

        let events = store.list_service_events(&resolved.pilot_ids)?;
        let timeline = build_service_timeline(&events, country, &resolver);
        info!(
            tip = resolved.lineage.tip,
            events = events.len(),
            promotions = timeline.promotions.len(),
            awards = timeline.awards.len(),
            "resolved service record"
        );
        Ok(ServiceRecord { pilot_info, promotions: timeline.promotions, awards: timeline.awards })
    }

    /// Ordered label to value report for the lineage's current pilot.
    ///
    /// # Errors
    /// Returns [`PassportError::NotFound`] when `descriptor` matches no pilot,
    /// [`PassportError::SourceUnavailable`] when the database cannot be opened,
    /// and [`PassportError::Lineage`] when the career chain is corrupt.
    pub fn resolve_stats(&self, descriptor: &str) -> PassportResult<Map<String, Value>> {
        let store = self.open_store()?;
        let resolved = resolve_pilot(&store, descriptor)?;
        let Some(row) = store.load_stat_row(resolved.tip_pilot_id)? else {
            return Err(PassportError::NotFound(descriptor.to_string()));
        };

        let report = build_stat_report(&row);
        info!(
            tip_pilot_id = resolved.tip_pilot_id,
            columns = row.len(),
            fields = report.len(),
            "resolved stats"
        );
        Ok(report)
    }

    /// Every sortie flown across the lineage, oldest first.
    ///
    /// # Errors
    /// Returns [`PassportError::NotFound`] when `descriptor` matches no pilot,
    /// [`PassportError::SourceUnavailable`] when the database cannot be opened,
    /// and [`PassportError::Lineage`] when the career chain is corrupt.
    pub fn resolve_sorties(&self, descriptor: &str) -> PassportResult<Vec<SortieSummary>> {
        let store = self.open_store()?;
        let resolved = resolve_pilot(&store, descriptor)?;

        let plan = store.sortie_kill_plan()?;
        debug!(kill_columns = plan.columns().len(), "planned sortie kill columns");
        let mut sorties = store.list_sorties(&resolved.pilot_ids, &plan)?;
        order_sorties(&mut sorties);

        let mut templates = BTreeMap::new();
        let mut summaries = Vec::with_capacity(sorties.len());
        for sortie in &sorties {
            let template = sortie.mission_id.and_then(|mission_id| {
                templates
                    .entry(mission_id)
                    .or_insert_with(|| mission_template(&store, mission_id))
                    .clone()
            });
            summaries.push(summarize_sortie(sortie, &plan, template.as_deref()));
        }

        info!(
            pilots = resolved.pilot_ids.len(),
            sorties = summaries.len(),
            "resolved sorties"
        );
        Ok(summaries)
    }
}

fn resolve_pilot(store: &SqliteStore, descriptor: &str) -> PassportResult<ResolvedPilot> {
    let not_found = || PassportError::NotFound(descriptor.to_string());
    let seed_pilot = store.find_pilot_by_descriptor(descriptor)?.ok_or_else(not_found)?;
    let seed = store.first_career_for_pilot(seed_pilot)?.ok_or_else(not_found)?;

    let graph = CareerGraph::new(store.list_careers()?);
    let lineage = graph.resolve(seed)?;
    warn_if_ambiguous(&lineage);

    let pilot_ids = graph.pilot_ids(&lineage);
    let tip_pilot_id = graph.tip_pilot_id(&lineage).ok_or_else(not_found)?;
    debug!(
        seed,
        seed_pilot,
        members = lineage.members.len(),
        tip = lineage.tip,
        tip_pilot_id,
        "resolved lineage"
    );
    Ok(ResolvedPilot { lineage, pilot_ids, tip_pilot_id })
}

fn warn_if_ambiguous(lineage: &Lineage) {
    if lineage.ambiguous_tip {
        warn!(
            tip = lineage.tip,
            members = lineage.members.len(),
            "lineage has no single terminal career; picked the highest id"
        );
    }
}

fn squadron_name(
    store: &SqliteStore,
    resolver: &ResourceResolver,
    squadron_id: Option<i64>,
) -> PassportResult<String> {
    let Some(squadron_id) = squadron_id.filter(|id| *id != 0) else {
        return Ok(UNKNOWN.to_string());
    };
    let config_id = store.squadron_config_id(squadron_id)?;
    Ok(resolver.squadron_short_name(config_id))
}

/// Mission templates only label sorties, so a failed lookup degrades to an
/// empty mission type.
fn mission_template(store: &SqliteStore, mission_id: i64) -> Option<String> {
    match store.mission_template(mission_id) {
        Ok(template) => template,
        Err(err) => {
            warn!(mission_id, error = %format!("{err:#}"), "mission lookup failed");
            None
        }
    }
}
