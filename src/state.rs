//! In-memory visitor store with SQLite persistence

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use rusqlite::{params, Connection};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// A single visitor session. Owned and mutated by the store; everything else
/// only reads it.
#[derive(Debug, Clone)]
pub struct Visitor {
    pub id: i64,
    /// Signed identity hash. Never rendered in any response.
    pub session_key: String,
    /// Never rendered in any response.
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub url: String,
    pub page_views: u64,
    /// Opaque geolocation payload, stored verbatim as received.
    pub geoip_data: Option<String>,
    pub last_update: DateTime<Utc>,
    /// Authenticated username, when the upstream proxy supplies one.
    pub user: Option<String>,
}

/// One observed page view, as extracted by the track endpoint.
#[derive(Debug, Clone)]
pub struct PageVisit {
    pub session_key: String,
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: String,
    pub url: String,
    pub user: Option<String>,
}

/// Visitor table keyed by session key, with snapshot persistence.
pub struct VisitorStore {
    visitors: DashMap<String, Visitor>,
    next_id: AtomicI64,
    db: Mutex<Connection>,
}

impl VisitorStore {
    /// Open (or create) the SQLite file and load all persisted visitors.
    pub fn open(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open(path)?;
        Self::from_conn(conn)
    }

    /// Fresh store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        Self::from_conn(conn)
    }

    fn from_conn(conn: Connection) -> Result<Self, Box<dyn std::error::Error>> {
        init_db(&conn)?;

        let store = VisitorStore {
            visitors: DashMap::new(),
            next_id: AtomicI64::new(1),
            db: Mutex::new(conn),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&self) -> Result<(), Box<dyn std::error::Error>> {
        let conn = self.db.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, session_key, ip_address, user_agent, referrer, url,
                    page_views, geoip_data, last_update, username
             FROM visitors",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Visitor {
                id: row.get(0)?,
                session_key: row.get(1)?,
                ip_address: row.get(2)?,
                user_agent: row.get(3)?,
                referrer: row.get(4)?,
                url: row.get(5)?,
                page_views: row.get::<_, i64>(6)? as u64,
                geoip_data: row.get(7)?,
                last_update: Utc
                    .timestamp_opt(row.get::<_, i64>(8)?, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
                user: row.get(9)?,
            })
        })?;

        let mut max_id = 0;
        for row in rows {
            let v = row?;
            max_id = max_id.max(v.id);
            self.visitors.insert(v.session_key.clone(), v);
        }
        self.next_id.store(max_id + 1, Ordering::Relaxed);

        tracing::info!("Loaded {} visitors", self.visitors.len());
        Ok(())
    }

    /// Record one page request: bumps the existing session or opens a new
    /// one. Returns the visitor id.
    pub fn record_visit(&self, visit: PageVisit) -> i64 {
        let now = Utc::now();
        let mut entry = self
            .visitors
            .entry(visit.session_key.clone())
            .or_insert_with(|| Visitor {
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
                session_key: visit.session_key.clone(),
                ip_address: visit.ip_address.clone(),
                user_agent: String::new(),
                referrer: String::new(),
                url: String::new(),
                page_views: 0,
                geoip_data: None,
                last_update: now,
                user: None,
            });

        let v = entry.value_mut();
        v.page_views += 1;
        v.last_update = now;
        v.url = visit.url;
        v.user_agent = visit.user_agent;
        if !visit.referrer.is_empty() {
            v.referrer = visit.referrer;
        }
        if visit.user.is_some() {
            v.user = visit.user;
        }
        v.id
    }

    /// Attach a geolocation payload to an existing session, if still present.
    pub fn attach_geoip(&self, session_key: &str, blob: String) {
        if let Some(mut v) = self.visitors.get_mut(session_key) {
            v.geoip_data = Some(blob);
        }
    }

    pub fn get(&self, session_key: &str) -> Option<Visitor> {
        self.visitors.get(session_key).map(|v| v.clone())
    }

    /// Every session currently held, in no particular order.
    pub fn snapshot(&self) -> Vec<Visitor> {
        self.visitors.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    #[cfg(test)]
    pub fn set_last_update(&self, session_key: &str, ts: DateTime<Utc>) {
        if let Some(mut v) = self.visitors.get_mut(session_key) {
            v.last_update = ts;
        }
    }

    /// Save on a blocking thread.
    pub async fn save_async(
        self: std::sync::Arc<Self>,
        prune_after: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tokio::task::spawn_blocking(move || self.save(prune_after)).await??;
        Ok(())
    }

    /// Drop sessions idle longer than `prune_after` seconds, then rewrite
    /// the table in one transaction (ensures deletions are persisted).
    pub fn save(&self, prune_after: u64) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let horizon = Utc::now() - Duration::seconds(prune_after as i64);
        self.visitors.retain(|_, v| v.last_update >= horizon);

        let conn = self.db.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM visitors", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO visitors
                    (id, session_key, ip_address, user_agent, referrer, url,
                     page_views, geoip_data, last_update, username)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for entry in self.visitors.iter() {
                let v = entry.value();
                stmt.execute(params![
                    v.id,
                    v.session_key,
                    v.ip_address,
                    v.user_agent,
                    v.referrer,
                    v.url,
                    v.page_views as i64,
                    v.geoip_data,
                    v.last_update.timestamp(),
                    v.user,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Saved {} visitors", self.visitors.len());
        Ok(())
    }
}

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS visitors (
            id INTEGER PRIMARY KEY,
            session_key TEXT NOT NULL UNIQUE,
            ip_address TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            referrer TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT '',
            page_views INTEGER NOT NULL DEFAULT 0,
            geoip_data TEXT,
            last_update INTEGER NOT NULL,
            username TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_visitors_last_update ON visitors(last_update);
        ",
    )?;
    Ok(())
}
