//! Class-count statistics driving both node training and voting.

/// Per-class sample counts with Shannon-entropy queries.
///
/// The training hot path recomputes entropy for millions of candidate
/// partitions, and classification sums histograms across trees, so
/// every operation here is allocation-free after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Histogram {
    sample_total: u64,
    class_totals: Vec<u32>,
}

impl Histogram {
    /// Creates an all-zero histogram covering `class_count` classes.
    pub fn new(class_count: usize) -> Self {
        Histogram {
            sample_total: 0,
            class_totals: vec![0; class_count],
        }
    }

    pub(crate) fn from_parts(sample_total: u64, class_totals: Vec<u32>) -> Self {
        Histogram {
            sample_total,
            class_totals,
        }
    }

    /// Number of classes covered by the histogram.
    pub fn class_count(&self) -> usize {
        self.class_totals.len()
    }

    /// Total number of samples recorded across all classes.
    pub fn sample_total(&self) -> u64 {
        self.sample_total
    }

    /// Population of a specific class, 0 for out-of-range indices.
    pub fn class_total(&self, class: usize) -> u32 {
        self.class_totals.get(class).copied().unwrap_or(0)
    }

    pub(crate) fn totals(&self) -> &[u32] {
        &self.class_totals
    }

    /// Records one sample of `class`. Returns false (and changes
    /// nothing) when the class index is out of range.
    pub fn increment(&mut self, class: usize) -> bool {
        if class >= self.class_totals.len() {
            return false;
        }
        self.sample_total += 1;
        self.class_totals[class] += 1;
        true
    }

    /// Removes a class from the histogram, used to suppress the
    /// background class at voting time. Out-of-range indices are
    /// ignored.
    pub fn clear_class(&mut self, class: usize) {
        if class >= self.class_totals.len() {
            return;
        }
        self.sample_total -= u64::from(self.class_totals[class]);
        self.class_totals[class] = 0;
    }

    /// Fraction of the sample population held by `class`; 0 when the
    /// histogram is empty or the index is out of range.
    pub fn percentage(&self, class: usize) -> f32 {
        if class >= self.class_totals.len() || self.sample_total == 0 {
            return 0.0;
        }
        self.class_totals[class] as f32 / self.sample_total as f32
    }

    /// Shannon entropy over the class distribution, skipping empty
    /// classes (the 0 * log 0 term).
    pub fn entropy(&self) -> f32 {
        let mut total = 0.0f32;
        for class in 0..self.class_totals.len() {
            let p = self.percentage(class);
            if p > 0.0 {
                total += p * p.log2();
            }
        }
        -total
    }

    /// Index of the first maximum. An empty or all-zero histogram
    /// reports class 0; callers that need "no winner" must check
    /// [`Histogram::sample_total`] themselves.
    pub fn dominant_class(&self) -> usize {
        let mut highest_total = 0u32;
        let mut highest_index = 0usize;
        for (index, &total) in self.class_totals.iter().enumerate() {
            if total > highest_total {
                highest_total = total;
                highest_index = index;
            }
        }
        highest_index
    }

    /// Componentwise sum. Ignored when the class counts differ.
    pub fn merge(&mut self, rhs: &Histogram) {
        if self.class_totals.len() != rhs.class_totals.len() {
            return;
        }
        self.sample_total += rhs.sample_total;
        for (total, &other) in self.class_totals.iter_mut().zip(&rhs.class_totals) {
            *total += other;
        }
    }
}
