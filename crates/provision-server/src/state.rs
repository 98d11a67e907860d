use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use provision_core::config::Config;
use provision_core::controller::CycleReport;
use provision_core::paths;
use provision_core::store::ProvisionDb;
use serde::Serialize;

/// Finished cycles kept for `GET /api/cycles`.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub id: String,
    pub status: CycleStatus,
    pub max_total_iterations: Option<u32>,
    pub delay_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<CycleReport>,
    pub error: Option<String>,
}

/// In-memory cycle history, newest first. At most one record is running.
#[derive(Debug, Default)]
pub struct CycleLog {
    records: VecDeque<CycleRecord>,
}

impl CycleLog {
    pub fn running(&self) -> Option<&CycleRecord> {
        self.records
            .iter()
            .find(|r| r.status == CycleStatus::Running)
    }

    /// Record a new running cycle, or return `None` if one is already running.
    pub fn try_begin(
        &mut self,
        max_total_iterations: Option<u32>,
        delay_seconds: f64,
    ) -> Option<String> {
        if self.running().is_some() {
            return None;
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.records.push_front(CycleRecord {
            id: id.clone(),
            status: CycleStatus::Running,
            max_total_iterations,
            delay_seconds,
            started_at: Utc::now(),
            finished_at: None,
            report: None,
            error: None,
        });
        self.records.truncate(HISTORY_LIMIT);
        Some(id)
    }

    pub fn finish(&mut self, id: &str, result: Result<CycleReport, String>) {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return;
        };
        record.finished_at = Some(Utc::now());
        match result {
            Ok(report) => {
                record.status = CycleStatus::Completed;
                record.report = Some(report);
            }
            Err(e) => {
                record.status = CycleStatus::Failed;
                record.error = Some(e);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&CycleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn list(&self) -> Vec<CycleRecord> {
        self.records.iter().cloned().collect()
    }
}

/// Shared application state passed to all route handlers.
///
/// The database is opened once here; redb holds an exclusive lock on the
/// file for as long as the handle lives.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub db: Arc<ProvisionDb>,
    pub cycles: Arc<Mutex<CycleLog>>,
}

impl AppState {
    pub fn open(root: PathBuf) -> provision_core::Result<Self> {
        let config = Config::load(&root)?;
        let db = ProvisionDb::open(&paths::db_path(&root))?;
        Ok(Self {
            root,
            config: Arc::new(config),
            db: Arc::new(db),
            cycles: Arc::default(),
        })
    }

    pub fn cycles(&self) -> MutexGuard<'_, CycleLog> {
        self.cycles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
