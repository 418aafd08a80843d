//! Learner statistics: a cache keyed by contest, backed by persistence ports.
//!
//! Updates never write to disk on the caller's thread. Every mutation is
//! emitted as a [`StatsEvent`] onto a queue drained by [`PersistenceWorker`].

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::types::{AnswerRecord, UserStats};

/// Persistence port for learner statistics.
pub trait StatsStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<UserStats>>;
    fn save(&self, key: &str, stats: &UserStats) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Local store: one JSON file per key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_stats.json", key))
    }
}

impl StatsStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<UserStats>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let stats = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(stats))
    }

    fn save(&self, key: &str, stats: &UserStats) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path_for(key))?;

        serde_json::to_writer_pretty(file, stats)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Highest `total` wins; ties keep the local copy.
pub fn merge_highest_total(
    local: Option<UserStats>,
    remote: Option<UserStats>,
) -> Option<UserStats> {
    match (local, remote) {
        (Some(local), Some(remote)) if remote.total > local.total => Some(remote),
        (Some(local), _) => Some(local),
        (None, remote) => remote,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsEvent {
    Saved { key: String, stats: UserStats },
    Reset { key: String },
}

pub struct StatsCache {
    entries: HashMap<String, UserStats>,
    local: Arc<dyn StatsStore>,
    remote: Option<Arc<dyn StatsStore>>,
    events: UnboundedSender<StatsEvent>,
}

impl StatsCache {
    pub fn new(
        local: Arc<dyn StatsStore>,
        remote: Option<Arc<dyn StatsStore>>,
        events: UnboundedSender<StatsEvent>,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            local,
            remote,
            events,
        }
    }

    fn load_from(store: &dyn StatsStore, key: &str, side: &str) -> Option<UserStats> {
        match store.load(key) {
            Ok(stats) => stats,
            Err(e) => {
                warn!(key = key, side = side, error = %e, "Failed to load stats");
                None
            }
        }
    }

    fn populate(&self, key: &str) -> UserStats {
        let local = Self::load_from(self.local.as_ref(), key, "local");
        let remote = self
            .remote
            .as_ref()
            .and_then(|store| Self::load_from(store.as_ref(), key, "remote"));

        let diverged = match (&local, &remote) {
            (Some(l), Some(r)) => l.total != r.total,
            (Some(_), None) => self.remote.is_some(),
            (None, Some(_)) => true,
            (None, None) => false,
        };

        let stats = merge_highest_total(local, remote).unwrap_or_default();
        if diverged {
            info!(key = key, total = stats.total, "Stats diverged between stores, syncing");
            self.emit(StatsEvent::Saved {
                key: key.to_string(),
                stats: stats.clone(),
            });
        }
        stats
    }

    fn emit(&self, event: StatsEvent) {
        if self.events.send(event).is_err() {
            error!("Persistence queue closed, stats change not saved");
        }
    }

    /// Cached stats for `key`, loaded from the stores on first use.
    pub fn get(&mut self, key: &str) -> &UserStats {
        if !self.entries.contains_key(key) {
            let stats = self.populate(key);
            debug!(key = key, total = stats.total, "Populated stats cache");
            self.entries.insert(key.to_string(), stats);
        }
        &self.entries[key]
    }

    pub fn record_answer(&mut self, key: &str, answer: &AnswerRecord) -> &UserStats {
        self.get(key);
        let stats = self.entries.entry(key.to_string()).or_default();
        stats.record_answer(answer);
        let snapshot = stats.clone();
        self.emit(StatsEvent::Saved {
            key: key.to_string(),
            stats: snapshot,
        });
        &self.entries[key]
    }

    pub fn reset(&mut self, key: &str) {
        info!(key = key, "Resetting stats");
        self.entries.insert(key.to_string(), UserStats::default());
        self.emit(StatsEvent::Reset {
            key: key.to_string(),
        });
    }
}

/// Drains the persistence queue into the local and remote stores.
pub struct PersistenceWorker {
    local: Arc<dyn StatsStore>,
    remote: Option<Arc<dyn StatsStore>>,
    events: UnboundedReceiver<StatsEvent>,
}

impl PersistenceWorker {
    pub fn new(
        local: Arc<dyn StatsStore>,
        remote: Option<Arc<dyn StatsStore>>,
        events: UnboundedReceiver<StatsEvent>,
    ) -> Self {
        Self {
            local,
            remote,
            events,
        }
    }

    fn apply(store: &dyn StatsStore, event: &StatsEvent, side: &str) {
        let result = match event {
            StatsEvent::Saved { key, stats } => store.save(key, stats),
            StatsEvent::Reset { key } => store.remove(key),
        };
        if let Err(e) = result {
            error!(side = side, key = event_key(event), error = %e, "Failed to persist stats");
        }
    }

    /// Runs until every sender is dropped; returns the number of events applied.
    pub async fn run(mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.events.recv().await {
            Self::apply(self.local.as_ref(), &event, "local");
            if let Some(remote) = &self.remote {
                Self::apply(remote.as_ref(), &event, "remote");
            }
            applied += 1;
        }
        info!(applied = applied, "Persistence queue closed");
        applied
    }
}

fn event_key(event: &StatsEvent) -> &str {
    match event {
        StatsEvent::Saved { key, .. } | StatsEvent::Reset { key } => key,
    }
}
