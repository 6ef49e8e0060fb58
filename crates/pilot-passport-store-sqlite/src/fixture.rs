//! Synthetic career databases shaped like the game's `cp.db`.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Column layout to create. `Legacy` mimics an older game release: the sortie
/// table lacks `flightTime` and most kill columns, and there is no `mission`
/// table at all.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FixtureSchema {
    Current,
    Legacy,
}

const CURRENT_SCHEMA: &str = "
    CREATE TABLE career (id INTEGER PRIMARY KEY, extends INTEGER, playerId INTEGER);
    CREATE TABLE pilot (
        id INTEGER PRIMARY KEY, description TEXT, squadronId INTEGER, rankId INTEGER,
        name TEXT, lastName TEXT, nickname TEXT, flightTime REAL, sorties INTEGER,
        goodSorties INTEGER, killLightPlane INTEGER, killMediumPlane INTEGER,
        killHeavyPlane INTEGER, killHeavyTank INTEGER, killTruck INTEGER,
        killAAAMachineGun INTEGER, bailouts INTEGER, customTally INTEGER
    );
    CREATE TABLE squadron (id INTEGER PRIMARY KEY, configId INTEGER);
    CREATE TABLE event (
        id INTEGER PRIMARY KEY, pilotId INTEGER, date TEXT, type INTEGER,
        rankId INTEGER, tpar2 TEXT, squadronId INTEGER
    );
    CREATE TABLE sortie (
        id INTEGER PRIMARY KEY, pilotId INTEGER, date TEXT, model TEXT, missionId INTEGER,
        planeStatus INTEGER, status INTEGER, flightTime REAL, killLightPlane INTEGER,
        killMediumPlane INTEGER, killHeavyPlane INTEGER, killTruck INTEGER,
        killHeavyTank INTEGER, killLightShip INTEGER, killPilot INTEGER, killAssist INTEGER
    );
    CREATE TABLE mission (id INTEGER PRIMARY KEY, mTemplate TEXT);
";

const LEGACY_SCHEMA: &str = "
    CREATE TABLE career (id INTEGER PRIMARY KEY, extends INTEGER, playerId INTEGER);
    CREATE TABLE pilot (
        id INTEGER PRIMARY KEY, description TEXT, squadronId INTEGER, rankId INTEGER,
        flightTime REAL, sorties INTEGER, goodSorties INTEGER, killLightPlane INTEGER
    );
    CREATE TABLE squadron (id INTEGER PRIMARY KEY, configId INTEGER);
    CREATE TABLE event (
        id INTEGER PRIMARY KEY, pilotId INTEGER, date TEXT, type INTEGER,
        rankId INTEGER, tpar2 TEXT, squadronId INTEGER
    );
    CREATE TABLE sortie (
        id INTEGER PRIMARY KEY, pilotId INTEGER, date TEXT, model TEXT, missionId INTEGER,
        planeStatus INTEGER, status INTEGER, killLightPlane INTEGER, killTruck INTEGER
    );
";

#[derive(Debug, Clone, Default)]
pub struct PilotSeed {
    pub id: i64,
    pub description: String,
    pub squadron_id: Option<i64>,
    pub rank_id: Option<i64>,
    pub stats: Vec<(&'static str, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct SortieSeed {
    pub pilot_id: i64,
    pub date: String,
    pub model: Option<String>,
    pub mission_id: Option<i64>,
    pub flight_time: Option<f64>,
    pub kills: Vec<(&'static str, i64)>,
}

pub struct CareerDbFixture {
    conn: Connection,
}

impl CareerDbFixture {
    /// Create a fresh database file at `path` with the given column layout.
    ///
    /// # Errors
    /// Returns an error when the file cannot be created or the schema fails to apply.
    pub fn create(path: &Path, schema: FixtureSchema) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to create fixture database at {}", path.display()))?;
        let ddl = match schema {
            FixtureSchema::Current => CURRENT_SCHEMA,
            FixtureSchema::Legacy => LEGACY_SCHEMA,
        };
        conn.execute_batch(ddl).context("failed to apply fixture schema")?;
        Ok(Self { conn })
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn career(&self, id: i64, extends: i64, player_id: i64) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO career (id, extends, playerId) VALUES (?1, ?2, ?3)",
                params![id, extends, player_id],
            )
            .with_context(|| format!("failed to insert career {id}"))?;
        Ok(self)
    }

    /// # Errors
    /// Returns an error when the insert fails or a stat column does not exist.
    pub fn pilot(&self, seed: &PilotSeed) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO pilot (id, description, squadronId, rankId) VALUES (?1, ?2, ?3, ?4)",
                params![seed.id, seed.description, seed.squadron_id, seed.rank_id],
            )
            .with_context(|| format!("failed to insert pilot {}", seed.id))?;
        for (column, value) in &seed.stats {
            self.conn
                .execute(
                    &format!("UPDATE pilot SET \"{column}\" = ?1 WHERE id = ?2"),
                    params![value, seed.id],
                )
                .with_context(|| format!("failed to set pilot {} column {column}", seed.id))?;
        }
        Ok(self)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn squadron(&self, id: i64, config_id: i64) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO squadron (id, configId) VALUES (?1, ?2)",
                params![id, config_id],
            )
            .with_context(|| format!("failed to insert squadron {id}"))?;
        Ok(self)
    }

    /// Insert a raw event row; `kind` is the stored type code.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn event(
        &self,
        pilot_id: i64,
        date: &str,
        kind: i64,
        rank_id: Option<i64>,
        award_code: Option<&str>,
    ) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO event (pilotId, date, type, rankId, tpar2) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![pilot_id, date, kind, rank_id, award_code],
            )
            .with_context(|| format!("failed to insert event for pilot {pilot_id}"))?;
        Ok(self)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn promotion(&self, pilot_id: i64, date: &str, rank_id: i64) -> Result<&Self> {
        self.event(pilot_id, date, 6, Some(rank_id), None)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn award(&self, pilot_id: i64, date: &str, award_code: &str) -> Result<&Self> {
        self.event(pilot_id, date, 8, None, Some(award_code))
    }

    /// # Errors
    /// Returns an error when the insert fails or a kill column does not exist.
    pub fn sortie(&self, seed: &SortieSeed) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO sortie (pilotId, date, model, missionId, planeStatus, status)
                 VALUES (?1, ?2, ?3, ?4, 0, 0)",
                params![seed.pilot_id, seed.date, seed.model, seed.mission_id],
            )
            .with_context(|| format!("failed to insert sortie for pilot {}", seed.pilot_id))?;
        let row_id = self.conn.last_insert_rowid();

        if let Some(flight_time) = seed.flight_time {
            self.conn
                .execute(
                    "UPDATE sortie SET flightTime = ?1 WHERE id = ?2",
                    params![flight_time, row_id],
                )
                .context("failed to set sortie flight time")?;
        }
        for (column, value) in &seed.kills {
            self.conn
                .execute(
                    &format!("UPDATE sortie SET \"{column}\" = ?1 WHERE id = ?2"),
                    params![value, row_id],
                )
                .with_context(|| format!("failed to set sortie column {column}"))?;
        }
        Ok(self)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn mission(&self, id: i64, template: &str) -> Result<&Self> {
        self.conn
            .execute(
                "INSERT INTO mission (id, mTemplate) VALUES (?1, ?2)",
                params![id, template],
            )
            .with_context(|| format!("failed to insert mission {id}"))?;
        Ok(self)
    }

    /// Apply arbitrary SQL, for shapes the builder methods do not cover.
    ///
    /// # Errors
    /// Returns an error when the batch fails.
    pub fn execute_batch(&self, sql: &str) -> Result<&Self> {
        self.conn.execute_batch(sql).context("failed to apply fixture sql")?;
        Ok(self)
    }
}
