//! Application session: the working copy of the dataset and the map built
//! from it.
//!
//! The store is read through a TTL cache. The working copy is replaced by
//! a fresh load only when the loaded fingerprint changed, a refresh was
//! requested, or there is no working copy yet. Rows appended by a
//! submission therefore stay visible until the store catches up.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use risk_map_dataset::cache::DatasetCache;
use risk_map_dataset::fingerprint::fingerprint;
use risk_map_dataset::normalize::normalize;
use risk_map_dataset::Dataset;
use risk_map_form::{FormController, SubmitError, SubmitOutcome, Submission};
use risk_map_map::cache::MapCache;
use risk_map_map::{MapBuild, MapOptions};
use risk_map_sheets::{StoreError, TabularStore};

/// What a [`Session::load`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Whether the working copy was replaced.
    pub replaced: bool,
    /// Fingerprint of the data loaded from the store.
    pub fingerprint: String,
    /// Rows in the working copy.
    pub row_count: usize,
    /// When the store data was read.
    pub loaded_at: DateTime<Utc>,
}

/// Per-application state shared by every request.
#[derive(Debug)]
pub struct Session {
    cache: DatasetCache,
    dataset: Option<Dataset>,
    loaded_fingerprint: Option<String>,
    force_refresh: bool,
    maps: MapCache,
}

impl Session {
    /// Creates an empty session whose store reads stay fresh for `ttl`.
    #[must_use]
    pub const fn new(ttl: TimeDelta) -> Self {
        Self {
            cache: DatasetCache::new(ttl),
            dataset: None,
            loaded_fingerprint: None,
            force_refresh: false,
            maps: MapCache::new(),
        }
    }

    /// Loads the dataset, from the cache when fresh, and updates the
    /// working copy if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read. The working
    /// copy is left as it was and nothing is cached.
    pub async fn load(
        &mut self,
        store: &dyn TabularStore,
        now: DateTime<Utc>,
    ) -> Result<LoadReport, StoreError> {
        let cached = self.cache.get(now).cloned();
        let entry = match cached {
            Some(entry) => entry,
            None => {
                let raw = store.read_all_records().await?;
                let dataset = normalize(&raw);
                log::info!("Loaded {} rows from the store", dataset.len());
                self.cache.insert(dataset, now).clone()
            }
        };

        let changed = self.loaded_fingerprint.as_deref() != Some(entry.fingerprint.as_str());
        let replaced = changed || self.force_refresh || self.dataset.is_none();
        if replaced {
            log::debug!(
                "Replacing working copy (changed={changed}, forced={})",
                self.force_refresh
            );
            self.dataset = Some(entry.dataset.as_ref().clone());
            self.loaded_fingerprint = Some(entry.fingerprint.clone());
            self.force_refresh = false;
        }

        Ok(LoadReport {
            replaced,
            fingerprint: entry.fingerprint,
            row_count: self.dataset.as_ref().map_or(0, Dataset::len),
            loaded_at: entry.loaded_at,
        })
    }

    /// Drops cached store data and forces the next load to replace the
    /// working copy.
    pub fn refresh(&mut self) {
        log::info!("Refresh requested");
        self.cache.clear();
        self.force_refresh = true;
    }

    /// The working copy, if loaded.
    #[must_use]
    pub const fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Fingerprint of the working copy as it is now.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.dataset
            .as_ref()
            .map_or_else(|| fingerprint(&Dataset::default()), fingerprint)
    }

    /// Runs a submission against the working copy.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] if the submission is rejected or the store
    /// append fails.
    pub async fn submit(
        &mut self,
        controller: &FormController<'_>,
        submission: &Submission,
        today: NaiveDate,
    ) -> Result<SubmitOutcome, SubmitError> {
        let dataset = self.dataset.get_or_insert_with(Dataset::default);
        let outcome = controller.submit(dataset, submission, today).await?;
        if outcome.mirrored {
            self.maps.invalidate();
        }
        Ok(outcome)
    }

    /// The map for the working copy, rebuilt only when it changed.
    /// `None` when there are no rows.
    pub fn map(&mut self, options: &MapOptions) -> Option<Arc<MapBuild>> {
        let dataset = self.dataset.as_ref()?;
        let fp = fingerprint(dataset);
        self.maps.get_or_build(dataset, &fp, options)
    }

    /// Number of map builds so far.
    #[must_use]
    pub const fn map_build_count(&self) -> usize {
        self.maps.build_count()
    }
}
