//! Background import of departments, programs and study tracks from the
//! university directory. Rows are upserted by their directory code; the
//! `enabled` flag on programs is never touched so operator decisions
//! survive the next import.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Department, LocalizedName, Program, StudyTrack};

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryDepartment {
    pub code: String,
    pub name: LocalizedName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryStudyTrack {
    pub code: String,
    pub name: LocalizedName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryProgram {
    pub code: String,
    pub name: LocalizedName,
    pub level: String,
    #[serde(default)]
    pub study_tracks: Vec<DirectoryStudyTrack>,
}

/// One full directory read, fetched atomically before any row is written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySnapshot {
    pub departments: Vec<DirectoryDepartment>,
    pub programs: Vec<DirectoryProgram>,
}

pub trait DirectoryClient {
    fn fetch(&self) -> impl Future<Output = Result<DirectorySnapshot>> + Send;
}

/// Fetches the snapshot from the directory's JSON API.
pub struct HttpDirectoryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::DirectorySync(format!("GET {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::DirectorySync(format!(
                "GET {url}: status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::DirectorySync(format!("GET {url}: invalid body: {e}")))
    }
}

impl DirectoryClient for HttpDirectoryClient {
    async fn fetch(&self) -> Result<DirectorySnapshot> {
        let departments = self.get_json("departments").await?;
        let programs = self.get_json("programs").await?;
        Ok(DirectorySnapshot {
            departments,
            programs,
        })
    }
}

/// Writes one snapshot into the store. Returns how many rows were upserted.
pub fn apply_snapshot(store: &dyn Store, snapshot: &DirectorySnapshot) -> Result<usize> {
    let now = Utc::now();
    let mut rows = 0;

    for dept in &snapshot.departments {
        store.upsert_department(&Department {
            id: dept.code.clone(),
            name: dept.name.clone(),
            created_at: now,
        })?;
        rows += 1;
    }

    for program in &snapshot.programs {
        store.upsert_program(&Program {
            id: program.code.clone(),
            name: program.name.clone(),
            level: program.level.clone(),
            enabled: true,
            created_at: now,
            updated_at: now,
        })?;
        rows += 1;

        for track in &program.study_tracks {
            store.upsert_study_track(&StudyTrack {
                id: track.code.clone(),
                program_id: program.code.clone(),
                name: track.name.clone(),
            })?;
            rows += 1;
        }
    }

    Ok(rows)
}

pub async fn sync_once<C: DirectoryClient>(client: &C, store: &dyn Store) -> Result<usize> {
    let snapshot = client.fetch().await?;
    apply_snapshot(store, &snapshot)
}

/// Runs the import on a fixed interval until the process exits. Ticks are
/// sequential; a slow fetch delays the next tick instead of overlapping it.
/// Failures are logged and left for the next tick.
pub async fn run_scheduler<C: DirectoryClient>(
    client: C,
    store: Arc<dyn Store>,
    interval_hours: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_hours * 3600));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match sync_once(&client, store.as_ref()).await {
            Ok(rows) => tracing::info!("directory sync complete, {} rows upserted", rows),
            Err(e) => tracing::warn!("directory sync failed: {}", e),
        }
    }
}
