// Append-only sample series and the derived drop signal

use crate::models::Sample;

/// Number of preceding samples averaged for the drop check.
pub const DROP_WINDOW: usize = 5;

/// A download below this fraction of the trailing mean is a drop.
pub const DROP_RATIO: f64 = 0.3;

/// Ordered samples for one monitoring session. Grows only through [`Series::push`].
#[derive(Debug, Clone, Default)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and returns its index.
    pub fn push(&mut self, sample: Sample) -> usize {
        self.samples.push(sample);
        self.samples.len() - 1
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// True when any sample carries an error message.
    pub fn has_errors(&self) -> bool {
        self.samples.iter().any(Sample::is_failed)
    }

    /// Mean download of the `DROP_WINDOW` samples before `index`, nulls excluded.
    /// `None` when fewer than `DROP_WINDOW` samples precede it or all of them are null.
    pub fn trailing_mean(&self, index: usize) -> Option<f64> {
        if index < DROP_WINDOW || index > self.samples.len() {
            return None;
        }
        let values: Vec<f64> = self.samples[index - DROP_WINDOW..index]
            .iter()
            .filter_map(|s| s.download)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Whether sample `index` is a download drop relative to the samples before it.
    pub fn is_drop(&self, index: usize) -> bool {
        let Some(download) = self.samples.get(index).and_then(|s| s.download) else {
            return false;
        };
        self.trailing_mean(index)
            .is_some_and(|mean| download < DROP_RATIO * mean)
    }

    pub fn drop_indices(&self) -> Vec<usize> {
        (0..self.samples.len()).filter(|&i| self.is_drop(i)).collect()
    }

    /// The most recent `max_points` samples, with the index of the first one.
    pub fn window(&self, max_points: usize) -> (usize, &[Sample]) {
        let start = self.samples.len().saturating_sub(max_points);
        (start, &self.samples[start..])
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
