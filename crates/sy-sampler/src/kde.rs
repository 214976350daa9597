//! Gaussian kernel density estimation backing the TPE samplers.

use rand::Rng;

/// A Gaussian kernel density estimator over one dimension.
///
/// TPE fits one of these to the "good" group and one to the "bad" group of
/// observed values, then ranks candidate draws by the density ratio.
#[derive(Clone, Debug)]
pub(crate) struct GaussianKde {
    centers: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Fits a KDE with Scott's-rule bandwidth (`n^(-1/5) * sigma`).
    ///
    /// Returns `None` for an empty sample set; degenerate sets where every
    /// value is identical fall back to a unit bandwidth.
    pub(crate) fn fit(centers: Vec<f64>) -> Option<Self> {
        if centers.is_empty() {
            return None;
        }
        let n = centers.len() as f64;
        let mean = centers.iter().sum::<f64>() / n;
        let variance = centers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let bandwidth = if std_dev < f64::EPSILON {
            1.0
        } else {
            n.powf(-0.2) * std_dev
        };
        Some(Self { centers, bandwidth })
    }

    /// Probability density at `x`: the average of Gaussian kernels centered
    /// at each sample.
    pub(crate) fn pdf(&self, x: f64) -> f64 {
        let inv_bw = 1.0 / self.bandwidth;
        let norm = inv_bw / (2.0 * std::f64::consts::PI).sqrt();
        let sum: f64 = self
            .centers
            .iter()
            .map(|&c| {
                let z = (x - c) * inv_bw;
                norm * (-0.5 * z * z).exp()
            })
            .sum();
        sum / self.centers.len() as f64
    }

    /// Draws from the estimated density: pick a random kernel center, then
    /// add Gaussian noise at the bandwidth scale (Box-Muller).
    pub(crate) fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let center = self.centers[rng.gen_range(0..self.centers.len())];
        let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        center + z * self.bandwidth
    }
}
