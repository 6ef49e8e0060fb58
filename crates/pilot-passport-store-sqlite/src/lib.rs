//! Read-only access to the game's career database (`cp.db`).
//!
//! The file is owned and written by the game process, so it is only ever opened
//! with `SQLITE_OPEN_READ_ONLY` and `query_only`. Column sets differ between
//! game releases; every query that touches version-dependent columns is built
//! from `PRAGMA table_info` rather than a fixed schema.

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

use std::path::Path;

use anyhow::{Context, Result};
use pilot_passport_core::{
    CareerId, CareerRecord, EventKind, EventRecord, KillColumnPlan, PilotId, PilotRecord,
    SortieRecord, StatRow, StatValue, ROOT_SENTINEL,
};
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};

pub const CAREER_TABLE: &str = "career";
pub const PILOT_TABLE: &str = "pilot";
pub const SQUADRON_TABLE: &str = "squadron";
pub const EVENT_TABLE: &str = "event";
pub const SORTIE_TABLE: &str = "sortie";
pub const MISSION_TABLE: &str = "mission";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing career database without write access.
    ///
    /// # Errors
    /// Returns an error when the file does not exist, is not a `SQLite`
    /// database, or the connection pragmas cannot be applied.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA query_only = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        // Opening is lazy; touch the schema so a non-database file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("{} is not a readable sqlite database", path.display()))?;

        Ok(Self { conn })
    }

    /// Column names of `table` in schema order; empty when the table is absent.
    ///
    /// # Errors
    /// Returns an error when the schema cannot be inspected.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        table_columns(&self.conn, table)
    }

    /// Load every career row for in-memory lineage resolution.
    ///
    /// # Errors
    /// Returns an error when the `career` table cannot be read.
    pub fn list_careers(&self) -> Result<Vec<CareerRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, extends, playerId FROM {CAREER_TABLE} ORDER BY id ASC"))
            .context("failed to prepare career scan")?;
        let mut rows = stmt.query([])?;
        let mut careers = Vec::new();

        while let Some(row) = rows.next()? {
            careers.push(CareerRecord {
                id: row.get(0)?,
                extends: integer(row.get_ref(1)?).unwrap_or(ROOT_SENTINEL),
                player_id: integer(row.get_ref(2)?),
            });
        }

        Ok(careers)
    }

    /// First pilot row whose description equals `descriptor`.
    ///
    /// # Errors
    /// Returns an error when the `pilot` table cannot be queried.
    pub fn find_pilot_by_descriptor(&self, descriptor: &str) -> Result<Option<PilotId>> {
        self.conn
            .query_row(
                "SELECT id FROM pilot WHERE description = ?1 ORDER BY id ASC LIMIT 1",
                params![descriptor],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up pilot by description")
    }

    /// First career owned by `pilot_id`; used as the lineage seed.
    ///
    /// # Errors
    /// Returns an error when the `career` table cannot be queried.
    pub fn first_career_for_pilot(&self, pilot_id: PilotId) -> Result<Option<CareerId>> {
        self.conn
            .query_row(
                &format!("SELECT id FROM {CAREER_TABLE} WHERE playerId = ?1 ORDER BY id ASC LIMIT 1"),
                params![pilot_id],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up career by pilot")
    }

    /// Identity fields of one pilot row. Columns missing from this game
    /// version read as `NULL`.
    ///
    /// # Errors
    /// Returns an error when the `pilot` table cannot be queried.
    pub fn load_pilot(&self, pilot_id: PilotId) -> Result<Option<PilotRecord>> {
        let columns = self.table_columns(PILOT_TABLE)?;
        let sql = format!(
            "SELECT id, {}, {}, {} FROM pilot WHERE id = ?1",
            column_or_null(&columns, "description"),
            column_or_null(&columns, "squadronId"),
            column_or_null(&columns, "rankId"),
        );
        self.conn
            .query_row(&sql, params![pilot_id], |row| {
                Ok(PilotRecord {
                    id: row.get(0)?,
                    description: text(row.get_ref(1)?).unwrap_or_default(),
                    squadron_id: integer(row.get_ref(2)?),
                    rank_id: integer(row.get_ref(3)?),
                })
            })
            .optional()
            .with_context(|| format!("failed to load pilot {pilot_id}"))
    }

    /// The complete pilot row in live schema order.
    ///
    /// # Errors
    /// Returns an error when the `pilot` table cannot be queried.
    pub fn load_stat_row(&self, pilot_id: PilotId) -> Result<Option<StatRow>> {
        let columns = self.table_columns(PILOT_TABLE)?;
        self.conn
            .query_row("SELECT * FROM pilot WHERE id = ?1", params![pilot_id], |row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| Ok((column.clone(), stat_value(row.get_ref(index)?))))
                    .collect::<rusqlite::Result<StatRow>>()
            })
            .optional()
            .with_context(|| format!("failed to load statistics for pilot {pilot_id}"))
    }

    /// Locale config id of a squadron; `None` when the squadron or table is absent.
    ///
    /// # Errors
    /// Returns an error when the `squadron` table exists but cannot be queried.
    pub fn squadron_config_id(&self, squadron_id: i64) -> Result<Option<i64>> {
        if !table_has_column(&self.conn, SQUADRON_TABLE, "configId")? {
            return Ok(None);
        }
        let config_id = self
            .conn
            .query_row("SELECT configId FROM squadron WHERE id = ?1", params![squadron_id], |row| {
                Ok(integer(row.get_ref(0)?))
            })
            .optional()
            .with_context(|| format!("failed to load squadron {squadron_id}"))?;
        Ok(config_id.flatten())
    }

    /// Promotion and award events owned by any of `pilot_ids`, oldest first.
    ///
    /// # Errors
    /// Returns an error when the `event` table exists but cannot be queried.
    pub fn list_service_events(&self, pilot_ids: &[PilotId]) -> Result<Vec<EventRecord>> {
        let columns = self.table_columns(EVENT_TABLE)?;
        if pilot_ids.is_empty() || !has_columns(&columns, &["pilotId", "type"]) {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT pilotId, {date}, type, {rank}, {award}, {squadron}
             FROM event
             WHERE type IN ({promotion}, {award_code}) AND pilotId IN ({ids})
             ORDER BY {date} ASC",
            date = column_or_null(&columns, "date"),
            rank = column_or_null(&columns, "rankId"),
            award = column_or_null(&columns, "tpar2"),
            squadron = column_or_null(&columns, "squadronId"),
            promotion = EventKind::PROMOTION_CODE,
            award_code = EventKind::AWARD_CODE,
            ids = placeholders(pilot_ids.len()),
        );
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare event query")?;
        let mut rows = stmt.query(params_from_iter(pilot_ids))?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            events.push(EventRecord {
                owner_pilot_id: row.get(0)?,
                date: text(row.get_ref(1)?).unwrap_or_default(),
                kind: EventKind::from_code(integer(row.get_ref(2)?).unwrap_or_default()),
                rank_id: integer(row.get_ref(3)?),
                award_code: text(row.get_ref(4)?),
                squadron_id: integer(row.get_ref(5)?),
            });
        }

        Ok(events)
    }

    /// Kill columns present in this version's `sortie` table, grouped by bucket.
    ///
    /// # Errors
    /// Returns an error when the schema cannot be inspected.
    pub fn sortie_kill_plan(&self) -> Result<KillColumnPlan> {
        Ok(KillColumnPlan::from_columns(&self.table_columns(SORTIE_TABLE)?))
    }

    /// Sortie rows owned by any of `pilot_ids`, reading only the kill columns
    /// in `plan`.
    ///
    /// # Errors
    /// Returns an error when the `sortie` table exists but cannot be queried.
    pub fn list_sorties(
        &self,
        pilot_ids: &[PilotId],
        plan: &KillColumnPlan,
    ) -> Result<Vec<SortieRecord>> {
        let columns = self.table_columns(SORTIE_TABLE)?;
        if pilot_ids.is_empty() || !has_columns(&columns, &["pilotId"]) {
            return Ok(Vec::new());
        }

        let kill_columns = plan.columns();
        let mut select = vec![
            "pilotId".to_string(),
            column_or_null(&columns, "date"),
            column_or_null(&columns, "model"),
            column_or_null(&columns, "missionId"),
            column_or_null(&columns, "planeStatus"),
            column_or_null(&columns, "status"),
            column_or_null(&columns, "flightTime"),
        ];
        select.extend(kill_columns.iter().map(|column| column_or_null(&columns, column)));
        let sql = format!(
            "SELECT {} FROM sortie WHERE pilotId IN ({}) ORDER BY {} ASC",
            select.join(", "),
            placeholders(pilot_ids.len()),
            column_or_null(&columns, "date"),
        );

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare sortie query")?;
        let mut rows = stmt.query(params_from_iter(pilot_ids))?;
        let mut sorties = Vec::new();

        while let Some(row) = rows.next()? {
            sorties.push(sortie_from_row(row, &kill_columns)?);
        }

        Ok(sorties)
    }

    /// Raw `mTemplate` of a mission; `None` when the mission or column is absent.
    ///
    /// # Errors
    /// Returns an error when the `mission` table exists but cannot be queried.
    pub fn mission_template(&self, mission_id: i64) -> Result<Option<String>> {
        if !table_has_column(&self.conn, MISSION_TABLE, "mTemplate")? {
            return Ok(None);
        }
        let template = self
            .conn
            .query_row("SELECT mTemplate FROM mission WHERE id = ?1", params![mission_id], |row| {
                Ok(text(row.get_ref(0)?))
            })
            .optional()
            .with_context(|| format!("failed to load mission {mission_id}"))?;
        Ok(template.flatten())
    }
}

fn sortie_from_row(row: &Row<'_>, kill_columns: &[&str]) -> rusqlite::Result<SortieRecord> {
    let kills = kill_columns
        .iter()
        .enumerate()
        .map(|(offset, column)| {
            Ok(((*column).to_string(), integer(row.get_ref(7 + offset)?).unwrap_or_default()))
        })
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(SortieRecord {
        owner_pilot_id: row.get(0)?,
        date: text(row.get_ref(1)?).unwrap_or_default(),
        model_path: text(row.get_ref(2)?),
        mission_id: integer(row.get_ref(3)?),
        plane_status: integer(row.get_ref(4)?),
        status: integer(row.get_ref(5)?),
        flight_time_seconds: stat_value(row.get_ref(6)?).and_then(|value| value.as_f64()),
        kills,
    })
}

fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table_name],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("failed to check if table exists: {table_name}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    if !table_exists(conn, table)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{table}\")"))
        .with_context(|| format!("failed to inspect table_info for {table}"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();

    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }

    Ok(columns)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    Ok(table_columns(conn, table)?.iter().any(|name| name == column))
}

fn has_columns(columns: &[String], required: &[&str]) -> bool {
    required.iter().all(|needed| columns.iter().any(|name| name == needed))
}

/// Quoted column reference, or a `NULL` literal when this schema lacks it.
fn column_or_null(columns: &[String], column: &str) -> String {
    if columns.iter().any(|name| name == column) {
        format!("\"{column}\"")
    } else {
        "NULL".to_string()
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn stat_value(value: ValueRef<'_>) -> Option<StatValue> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(value) => Some(StatValue::Integer(value)),
        ValueRef::Real(value) => Some(StatValue::Real(value)),
        ValueRef::Text(bytes) => Some(StatValue::Text(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integer(value: ValueRef<'_>) -> Option<i64> {
    match stat_value(value)? {
        StatValue::Integer(value) => Some(value),
        other => other.as_f64().map(|value| value as i64),
    }
}

fn text(value: ValueRef<'_>) -> Option<String> {
    match stat_value(value)? {
        StatValue::Text(value) => Some(value),
        StatValue::Integer(value) => Some(value.to_string()),
        StatValue::Real(value) => Some(value.to_string()),
    }
}
