//! Running mean/variance accumulation over array-valued samples.

use ndarray as nd;

/// Sample mean and unbiased variance of an array-valued quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    pub mean: nd::Array1<f64>,
    pub var: nd::Array1<f64>,
}

impl Estimate {
    /// Standard error of the mean for `n` samples, element-wise.
    pub fn std_err(&self, n: usize) -> nd::Array1<f64> {
        self.var.mapv(|v| (v / n as f64).sqrt())
    }
}

/// Incremental accumulator for the mean and sum of squared deviations of a
/// stream of equal-length samples.
///
/// After pushing the `i`-th sample `f_i`, with `sum_i` the running sum
/// including `f_i`, the squared-deviation sum is updated as
/// ```text
/// S_i = S_{i-1} + (i f_i - sum_i)^2 / (i (i - 1))    (i > 1)
/// ```
/// so that `S_N / (N - 1)` is the unbiased sample variance.
#[derive(Clone, Debug)]
pub struct RunningStats {
    count: usize,
    sum: nd::Array1<f64>,
    var_sum: nd::Array1<f64>,
}

impl RunningStats {
    /// Create a new, empty accumulator for samples of length `len`.
    pub fn new(len: usize) -> Self {
        Self {
            count: 0,
            sum: nd::Array1::zeros(len),
            var_sum: nd::Array1::zeros(len),
        }
    }

    /// Number of samples pushed so far.
    pub fn count(&self) -> usize { self.count }

    /// Add a sample.
    ///
    /// *Panics* if `f` does not have the length given at construction.
    pub fn push(&mut self, f: &nd::Array1<f64>) {
        self.count += 1;
        self.sum += f;
        if self.count > 1 {
            let i = self.count as f64;
            let denom = i * (i - 1.0);
            nd::Zip::from(&mut self.var_sum)
                .and(f)
                .and(&self.sum)
                .for_each(|s, &fk, &sumk| {
                    *s += (i * fk - sumk).powi(2) / denom;
                });
        }
    }

    /// Current mean. All zeros if nothing has been pushed.
    pub fn mean(&self) -> nd::Array1<f64> {
        if self.count == 0 {
            nd::Array1::zeros(self.sum.len())
        } else {
            &self.sum / self.count as f64
        }
    }

    /// Current unbiased variance. All zeros if fewer than two samples have been
    /// pushed.
    pub fn variance(&self) -> nd::Array1<f64> {
        if self.count < 2 {
            nd::Array1::zeros(self.var_sum.len())
        } else {
            &self.var_sum / (self.count - 1) as f64
        }
    }

    /// Consume `self`, returning the mean and variance.
    pub fn finish(self) -> Estimate {
        Estimate { mean: self.mean(), var: self.variance() }
    }
}
