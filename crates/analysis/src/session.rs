//! One analysis session: memoized region loading and per-year classification
//! with local recovery of failed years.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use tidemark_core::BBox;
use tracing::{debug, warn};

use crate::classifier::ChangeClassifier;
use crate::error::{ClassifyError, Result};
use crate::model::{ClassificationOutput, YearOutcome};
use crate::region::{Region, RegionLoader};

/// Entries kept per memo table.
const MEMO_CAPACITY: usize = 32;

type BoundsKey = [u64; 4];

fn bounds_key(bbox: &BBox) -> BoundsKey {
    bbox.to_array().map(f64::to_bits)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultKey {
    year: i32,
    bounds: BoundsKey,
    settings: String,
}

/// Ordered outcomes of a run, plus the full outputs of the years that
/// succeeded.
#[derive(Debug, Clone, Default)]
pub struct SessionRun {
    pub outcomes: Vec<YearOutcome>,
    pub outputs: Vec<Arc<ClassificationOutput>>,
}

impl SessionRun {
    pub fn failures(&self) -> impl Iterator<Item = &YearOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn output(&self, year: i32) -> Option<&ClassificationOutput> {
        self.outputs.iter().map(Arc::as_ref).find(|o| o.result.year == year)
    }
}

pub struct Session<C> {
    loader: RegionLoader,
    classifier: C,
    regions: LruCache<(PathBuf, BoundsKey), Arc<Region>>,
    results: LruCache<ResultKey, Arc<ClassificationOutput>>,
}

impl<C: ChangeClassifier> Session<C> {
    pub fn new(loader: RegionLoader, classifier: C) -> Self {
        let capacity = NonZeroUsize::new(MEMO_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self { loader, classifier, regions: LruCache::new(capacity), results: LruCache::new(capacity) }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Load (or recall) the region of `path` clipped to `bbox`.
    pub fn region(&mut self, path: &Path, bbox: &BBox) -> Result<Arc<Region>> {
        let key = (path.to_path_buf(), bounds_key(bbox));
        if let Some(region) = self.regions.get(&key) {
            debug!("Region {} from memo", path.display());
            return Ok(Arc::clone(region));
        }
        let region = Arc::new(self.loader.load(path, bbox)?);
        self.regions.put(key, Arc::clone(&region));
        Ok(region)
    }

    /// Classify one year. Successful results are memoized; failures are not.
    pub fn classify(&mut self, region: &Region, year: i32) -> std::result::Result<Arc<ClassificationOutput>, ClassifyError> {
        let key = ResultKey { year, bounds: bounds_key(region.bbox()), settings: self.classifier.settings_key() };
        if let Some(output) = self.results.get(&key) {
            debug!("{}: result from memo", year);
            return Ok(Arc::clone(output));
        }
        let output = Arc::new(self.classifier.classify(region, year)?);
        self.results.put(key, Arc::clone(&output));
        Ok(output)
    }

    /// Classify `years` in order. A failed year becomes a zero placeholder
    /// and processing continues; authentication failures end the run.
    pub fn run(&mut self, region: &Region, years: &[i32]) -> Result<SessionRun> {
        self.run_with_progress(region, years, |_, _| {})
    }

    /// [`Session::run`], calling `progress(year, index)` before each year.
    pub fn run_with_progress(
        &mut self,
        region: &Region,
        years: &[i32],
        mut progress: impl FnMut(i32, usize),
    ) -> Result<SessionRun> {
        let mut run = SessionRun::default();
        for (i, &year) in years.iter().enumerate() {
            progress(year, i);
            match self.classify(region, year) {
                Ok(output) => {
                    run.outcomes.push(YearOutcome::ok(output.result.clone()));
                    run.outputs.push(output);
                }
                Err(ClassifyError::Source(e)) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!("{}: {}; reporting zero areas", year, e);
                    run.outcomes.push(YearOutcome::failed(year, e.to_string()));
                }
            }
        }
        Ok(run)
    }
}

