//! Fingerprint-keyed map cache.
//!
//! A map is rebuilt only when the dataset fingerprint or the display
//! options change.

use std::sync::Arc;

use risk_map_dataset::Dataset;

use crate::{MapBuild, MapOptions, build_map};

#[derive(Debug)]
struct Entry {
    fingerprint: String,
    options: MapOptions,
    build: Option<Arc<MapBuild>>,
}

/// Holds the last built map.
#[derive(Debug, Default)]
pub struct MapCache {
    entry: Option<Entry>,
    builds: usize,
}

impl MapCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entry: None,
            builds: 0,
        }
    }

    /// Returns the cached map for `fingerprint`, building it from `dataset`
    /// on a miss. `None` means the dataset has no rows.
    pub fn get_or_build(
        &mut self,
        dataset: &Dataset,
        fingerprint: &str,
        options: &MapOptions,
    ) -> Option<Arc<MapBuild>> {
        if let Some(entry) = &self.entry
            && entry.fingerprint == fingerprint
            && entry.options == *options
        {
            log::debug!("Map cache hit ({fingerprint})");
            return entry.build.clone();
        }

        log::debug!("Map cache miss ({fingerprint}), rebuilding");
        let build = build_map(dataset, options).map(Arc::new);
        self.builds += 1;
        self.entry = Some(Entry {
            fingerprint: fingerprint.to_string(),
            options: options.clone(),
            build: build.clone(),
        });
        build
    }

    /// Forces the next call to rebuild.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of builds performed so far.
    #[must_use]
    pub const fn build_count(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_map_dataset::fingerprint::fingerprint;

    fn dataset(coordinate: &str) -> Dataset {
        Dataset::with_rows(
            vec!["Koordinat".to_string(), "Level Resiko".to_string()],
            vec![vec![coordinate.into(), "Low".into()]],
        )
        .unwrap()
    }

    #[test]
    fn unchanged_fingerprint_reuses_build() {
        let data = dataset("-7.9, 112.6");
        let fp = fingerprint(&data);
        let options = MapOptions::default();
        let mut cache = MapCache::new();

        let first = cache.get_or_build(&data, &fp, &options).unwrap();
        let second = cache.get_or_build(&data, &fp, &options).unwrap();

        assert_eq!(cache.build_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn changed_fingerprint_rebuilds() {
        let options = MapOptions::default();
        let mut cache = MapCache::new();

        let a = dataset("-7.9, 112.6");
        cache.get_or_build(&a, &fingerprint(&a), &options);
        let b = dataset("-8.0, 112.6");
        let build = cache.get_or_build(&b, &fingerprint(&b), &options).unwrap();

        assert_eq!(cache.build_count(), 2);
        assert!((build.map.markers[0].lat - -8.0).abs() < 1e-9);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let data = dataset("-7.9, 112.6");
        let fp = fingerprint(&data);
        let options = MapOptions::default();
        let mut cache = MapCache::new();

        cache.get_or_build(&data, &fp, &options);
        cache.invalidate();
        cache.get_or_build(&data, &fp, &options);
        assert_eq!(cache.build_count(), 2);
    }
}
