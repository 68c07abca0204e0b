
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, env, fs, path::PathBuf, sync::Arc};
use thiserror::Error;

pub mod categorizer;
pub mod search;
pub mod seed;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Message(String),
    #[error("club {0} not found")]
    NotFound(i64),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// SQLite-backed club directory.
///
/// Cloning is cheap; clones share one connection.
#[derive(Clone)]
pub struct ClubFinder {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub base_root: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvInfo {
    pub db_path: PathBuf,
}

/// A recurring `(day, time slot)` meeting occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeetingSlot {
    pub day: String,
    pub time_slot: String,
}

impl MeetingSlot {
    pub fn new(day: impl Into<String>, time_slot: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            time_slot: time_slot.into(),
        }
    }

    /// Parse the `"<Day>-<TimeSlot>"` wire form.
    ///
    /// Anything other than exactly two non-empty hyphen-separated fields is
    /// rejected, as are fields padded with whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split('-');
        let day = parts.next()?;
        let time_slot = parts.next()?;
        let exact = |field: &str| !field.is_empty() && field.trim() == field;
        if parts.next().is_some() || !exact(day) || !exact(time_slot) {
            return None;
        }
        Some(Self::new(day, time_slot))
    }

    pub fn wire(&self) -> String {
        format!("{}-{}", self.day, self.time_slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTime {
    #[serde(flatten)]
    pub slot: MeetingSlot,
    /// Free-form text the slot was parsed from, e.g. "Thursdays at 6:00 PM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MeetingTime {
    pub fn new(slot: MeetingSlot, description: Option<String>) -> Self {
        Self { slot, description }
    }
}

/// Category labels of a club.
///
/// Stored and serialized as one comma-joined string; parsed into distinct,
/// trimmed labels once when read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories(Vec<String>);

impl Categories {
    pub fn parse(raw: &str) -> Self {
        Self::from_labels(raw.split(','))
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() || out.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                continue;
            }
            out.push(label.to_string());
        }
        Self(out)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joined(&self) -> String {
        self.0.join(", ")
    }

    pub fn contains_label(&self, label: &str) -> bool {
        let wanted = label.trim().to_lowercase();
        self.0.iter().any(|l| l.to_lowercase() == wanted)
    }
}

impl Serialize for Categories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for Categories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Club {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub summary: String,
    pub categories: Categories,
    pub meeting_times: Vec<MeetingTime>,
    /// Little-endian f32 bytes written by the vectorizer; a cache only.
    #[serde(skip)]
    pub summary_embedding: Option<Vec<u8>>,
    pub created_at: String,
    pub updated_at: String,
}

impl Club {
    pub fn meeting_slots(&self) -> impl Iterator<Item = &MeetingSlot> {
        self.meeting_times.iter().map(|mt| &mt.slot)
    }

    pub fn has_slot(&self, slot: &MeetingSlot) -> bool {
        self.meeting_slots().any(|s| s == slot)
    }
}

/// Input for [`ClubFinder::add_club`].
#[derive(Debug, Clone, Default)]
pub struct NewClub {
    pub name: String,
    pub url: String,
    pub summary: String,
    pub categories: Categories,
    pub meeting_times: Vec<MeetingTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_clubs: usize,
    pub total_meeting_times: usize,
    /// Club count per category label
    pub categories: BTreeMap<String, usize>,
}

const CLUB_COLUMNS: &str =
    "id, name, url, description, category, summary_embedding, created_at, updated_at";

impl ClubFinder {
    pub fn initialize(overrides: EnvOverrides) -> CoreResult<Self> {
        let db_path = match overrides.db_path.or_else(|| env_path("CLUBFINDER_DB_PATH")) {
            Some(path) => path,
            None => overrides
                .base_root
                .or_else(|| env_path("CLUBFINDER_ROOT"))
                .or_else(default_base_root)
                .ok_or_else(|| CoreError::Message("Unable to resolve user home directory".into()))?
                .join("clubs.db"),
        };

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn, db_path)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> CoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS clubs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT 'Other',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_clubs_category ON clubs(category);

            CREATE TABLE IF NOT EXISTS meeting_times (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                club_id INTEGER NOT NULL REFERENCES clubs(id) ON DELETE CASCADE,
                day_of_week TEXT NOT NULL,
                time_slot TEXT NOT NULL,
                meeting_description TEXT,
                UNIQUE (club_id, day_of_week, time_slot)
            );

            CREATE INDEX IF NOT EXISTS idx_meeting_times_club ON meeting_times(club_id);
        ",
        )?;

        ensure_schema_migrations(&conn)?;

        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn env_info(&self) -> EnvInfo {
        EnvInfo {
            db_path: self.db_path.clone(),
        }
    }

    /// Insert a club. Returns `None` when a club with the same name exists.
    pub fn add_club(&self, club: &NewClub) -> CoreResult<Option<Club>> {
        let ts = now_iso();
        let id = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let id = insert_club(&tx, club, &ts)?;
            tx.commit()?;
            Ok(id)
        })?;
        match id {
            Some(id) => self.get_club(id),
            None => Ok(None),
        }
    }

    /// Insert many clubs in one transaction.
    ///
    /// The returned flags line up with `clubs`: `true` if inserted, `false`
    /// if skipped as a duplicate name. Any error rolls back the whole batch.
    pub fn add_clubs(&self, clubs: &[NewClub]) -> CoreResult<Vec<bool>> {
        let ts = now_iso();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = Vec::with_capacity(clubs.len());
            for club in clubs {
                inserted.push(insert_club(&tx, club, &ts)?.is_some());
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    pub fn get_club(&self, id: i64) -> CoreResult<Option<Club>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = ?1"))?;
            let club = stmt.query_row([id], row_to_club).optional()?;
            match club {
                Some(mut club) => {
                    club.meeting_times = load_meeting_times(conn, club.id)?;
                    Ok(Some(club))
                }
                None => Ok(None),
            }
        })
    }

    pub fn list_clubs(&self) -> CoreResult<Vec<Club>> {
        self.query_clubs(
            &format!("SELECT {CLUB_COLUMNS} FROM clubs ORDER BY id"),
            Vec::new(),
        )
    }

    pub fn count_clubs(&self) -> CoreResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM clubs", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn list_clubs_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<Club>> {
        self.query_clubs(
            &format!("SELECT {CLUB_COLUMNS} FROM clubs ORDER BY id LIMIT ?1 OFFSET ?2"),
            vec![limit as i64, offset as i64].into_iter().map(Into::into).collect(),
        )
    }

    /// Clubs whose category string contains `category`, ignoring case.
    pub fn clubs_by_category(&self, category: &str) -> CoreResult<Vec<Club>> {
        self.clubs_by_categories(&[category.to_string()])
    }

    /// Clubs matching any of `categories` by case-insensitive containment,
    /// each club once, in id order.
    pub fn clubs_by_categories(&self, categories: &[String]) -> CoreResult<Vec<Club>> {
        let wanted: Vec<String> = categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        // SQLite's lower() folds ASCII only, so the match runs on Rust strings.
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {CLUB_COLUMNS} FROM clubs ORDER BY id"))?;
            let mut clubs = Vec::new();
            for club in stmt.query_map([], row_to_club)? {
                let club = club?;
                let joined = club.categories.joined().to_lowercase();
                if wanted.iter().any(|c| joined.contains(c.as_str())) {
                    clubs.push(club);
                }
            }
            for club in &mut clubs {
                club.meeting_times = load_meeting_times(conn, club.id)?;
            }
            Ok(clubs)
        })
    }

    pub fn clubs_by_meeting_slot(&self, slot: &MeetingSlot) -> CoreResult<Vec<Club>> {
        self.query_clubs(
            &format!(
                "SELECT {CLUB_COLUMNS} FROM clubs WHERE id IN (
                    SELECT club_id FROM meeting_times WHERE day_of_week = ?1 AND time_slot = ?2
                 ) ORDER BY id"
            ),
            vec![slot.day.clone().into(), slot.time_slot.clone().into()],
        )
    }

    pub fn set_summary_embedding(&self, id: i64, bytes: &[u8]) -> CoreResult<()> {
        let ts = now_iso();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE clubs SET summary_embedding = ?1, updated_at = ?2 WHERE id = ?3",
                params![bytes, ts, id],
            )?;
            if changed == 0 {
                return Err(CoreError::NotFound(id));
            }
            Ok(())
        })
    }

    /// Delete every club and meeting time.
    pub fn clear_all(&self) -> CoreResult<usize> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM meeting_times", [])?;
            let removed = tx.execute("DELETE FROM clubs", [])?;
            tx.commit()?;
            Ok(removed)
        })
    }

    pub fn stats(&self) -> CoreResult<StoreStats> {
        let total_clubs = self.count_clubs()?;
        self.with_conn(|conn| {
            let total_meeting_times: i64 =
                conn.query_row("SELECT COUNT(*) FROM meeting_times", [], |row| row.get(0))?;
            let mut stmt = conn.prepare("SELECT category FROM clubs")?;
            let raw = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            let mut categories = BTreeMap::new();
            for value in raw {
                for label in Categories::parse(&value).labels() {
                    *categories.entry(label.clone()).or_insert(0) += 1;
                }
            }
            Ok(StoreStats {
                total_clubs,
                total_meeting_times: total_meeting_times as usize,
                categories,
            })
        })
    }

    fn query_clubs(&self, sql: &str, args: Vec<rusqlite::types::Value>) -> CoreResult<Vec<Club>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut clubs = stmt
                .query_map(params_from_iter(args), row_to_club)?
                .collect::<Result<Vec<_>, _>>()?;
            for club in &mut clubs {
                club.meeting_times = load_meeting_times(conn, club.id)?;
            }
            Ok(clubs)
        })
    }

    fn with_conn<F, T>(&self, action: F) -> CoreResult<T>
    where
        F: FnOnce(&Connection) -> CoreResult<T>,
    {
        let conn = self.conn.lock();
        action(&conn)
    }
}

fn insert_club(conn: &Connection, club: &NewClub, ts: &str) -> CoreResult<Option<i64>> {
    let name = club.name.trim();
    if name.is_empty() {
        return Err(CoreError::Message("Club name is required.".into()));
    }
    let exists = conn
        .query_row("SELECT id FROM clubs WHERE name = ?1", [name], |row| row.get::<_, i64>(0))
        .optional()?;
    if exists.is_some() {
        log::debug!("club {name:?} already exists, skipping");
        return Ok(None);
    }
    let category = if club.categories.is_empty() {
        "Other".to_string()
    } else {
        club.categories.joined()
    };
    conn.execute(
        "INSERT INTO clubs (name, url, description, category, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![name, club.url, club.summary, category, ts],
    )?;
    let id = conn.last_insert_rowid();
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO meeting_times (club_id, day_of_week, time_slot, meeting_description)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for mt in &club.meeting_times {
        stmt.execute(params![id, mt.slot.day, mt.slot.time_slot, mt.description])?;
    }
    Ok(Some(id))
}

fn load_meeting_times(conn: &Connection, club_id: i64) -> CoreResult<Vec<MeetingTime>> {
    let mut stmt = conn.prepare_cached(
        "SELECT day_of_week, time_slot, meeting_description FROM meeting_times
         WHERE club_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([club_id], |row| {
            Ok(MeetingTime {
                slot: MeetingSlot::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                description: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_club(row: &rusqlite::Row<'_>) -> rusqlite::Result<Club> {
    Ok(Club {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        summary: row.get(3)?,
        categories: Categories::parse(&row.get::<_, String>(4)?),
        meeting_times: Vec::new(),
        summary_embedding: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn ensure_schema_migrations(conn: &Connection) -> CoreResult<()> {
    // Databases created before vectorization existed lack the embedding column.
    let mut stmt = conn.prepare("PRAGMA table_info(clubs)")?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    if !cols.iter().any(|c| c == "summary_embedding") {
        conn.execute("ALTER TABLE clubs ADD COLUMN summary_embedding BLOB", [])?;
        log::info!("added clubs.summary_embedding column");
    }
    Ok(())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn default_base_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clubfinder"))
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().map(PathBuf::from)
}
