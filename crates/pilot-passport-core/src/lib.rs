//! Career lineage resolution and statistics aggregation over a point-in-time
//! snapshot of the game's career store.
//!
//! This crate is pure: it never touches the database or the filesystem. The
//! sqlite store produces the record types defined in [`records`], and resource
//! lookups go through the [`resources::ResourceSource`] trait.

pub mod descriptor;
pub mod lineage;
pub mod records;
pub mod resources;
pub mod stats;
pub mod timeline;

pub use descriptor::{country_name, PilotDescriptor, UNKNOWN};
pub use lineage::{CareerGraph, Lineage, LineageError};
pub use records::{
    CareerId, CareerRecord, EventKind, EventRecord, PilotId, PilotRecord, SortieRecord, StatRow,
    StatValue, ROOT_SENTINEL,
};
pub use resources::{
    parse_dotted_date, rank_image_file, ResourceCategory, ResourceResolver, ResourceSource,
    PLACEHOLDER_IMAGE,
};
pub use stats::{build_stat_report, format_stat_flight_time, friendly_label, success_rate};
pub use timeline::{
    aircraft_name, build_service_timeline, format_event_date, format_sortie_flight_time,
    mission_type_name, order_sorties, summarize_sortie, AwardEntry, KillColumnPlan, PromotionEntry,
    ServiceTimeline, SortieSummary,
};
