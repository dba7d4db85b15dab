//! Gaussian mixture colour model used by the graph-cut classifier

/// Number of Gaussian components per mixture
pub const COMPONENTS: usize = 5;

const SINGULAR_EPSILON: f64 = f64::EPSILON;
const VARIANCE_REGULARIZATION: f64 = 0.01;
const KMEANS_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
struct Component {
    weight: f64,
    mean: [f64; 3],
    inverse_covariance: [[f64; 3]; 3],
    /// `1 / sqrt(det(covariance))`
    norm: f64,
}

/// Running sums for one component while learning
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: [f64; 3],
    products: [[f64; 3]; 3],
}

impl Accumulator {
    fn add(&mut self, color: [f64; 3]) {
        self.count += 1;
        for i in 0..3 {
            self.sum[i] += color[i];
            for j in 0..3 {
                self.products[i][j] += color[i] * color[j];
            }
        }
    }
}

/// A 3-channel Gaussian mixture with [`COMPONENTS`] components
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    components: [Component; COMPONENTS],
}

impl GaussianMixture {
    /// Fit a mixture to `samples` given a component label per sample
    ///
    /// Components that receive no samples keep zero weight.
    #[must_use]
    pub fn learn(samples: &[[f64; 3]], labels: &[usize]) -> Self {
        let mut accumulators = [Accumulator::default(); COMPONENTS];
        for (color, &label) in samples.iter().zip(labels) {
            if let Some(acc) = accumulators.get_mut(label) {
                acc.add(*color);
            }
        }

        let total = samples.len().max(1) as f64;
        let mut components = [Component::default(); COMPONENTS];
        for (component, acc) in components.iter_mut().zip(&accumulators) {
            if acc.count == 0 {
                continue;
            }
            let n = acc.count as f64;
            let mean = [acc.sum[0] / n, acc.sum[1] / n, acc.sum[2] / n];

            let mut covariance = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    covariance[i][j] = acc.products[i][j] / n - mean[i] * mean[j];
                }
            }

            let mut det = determinant(&covariance);
            if det <= SINGULAR_EPSILON {
                for (i, row) in covariance.iter_mut().enumerate() {
                    row[i] += VARIANCE_REGULARIZATION;
                }
                det = determinant(&covariance);
            }

            *component = Component {
                weight: n / total,
                mean,
                inverse_covariance: inverse(&covariance, det),
                norm: 1.0 / det.sqrt(),
            };
        }

        Self { components }
    }

    /// Initial component labels from deterministic k-means
    #[must_use]
    pub fn initial_labels(samples: &[[f64; 3]]) -> Vec<usize> {
        kmeans(samples, COMPONENTS, KMEANS_ITERATIONS)
    }

    /// Mixture density at `color` (without the constant `(2π)^-3/2` factor)
    #[must_use]
    pub fn probability(&self, color: [f64; 3]) -> f64 {
        self.components
            .iter()
            .filter(|c| c.weight > 0.0)
            .map(|c| c.weight * component_density(c, color))
            .sum()
    }

    /// Index of the component most likely to have produced `color`
    ///
    /// Compared in log space; raw densities of tight components underflow
    /// to zero a few intensity levels away from their mean.
    #[must_use]
    pub fn most_likely_component(&self, color: [f64; 3]) -> usize {
        let mut best = 0;
        let mut best_log_density = f64::NEG_INFINITY;
        for (index, component) in self.components.iter().enumerate() {
            if component.weight <= 0.0 {
                continue;
            }
            let log_density = component_log_density(component, color);
            if log_density > best_log_density {
                best_log_density = log_density;
                best = index;
            }
        }
        best
    }

    /// Negative log-likelihood of `color` under the mixture
    ///
    /// Evaluated with log-sum-exp so colours far from every component still
    /// rank by distance instead of collapsing onto the same clamp.
    #[must_use]
    pub fn negative_log_likelihood(&self, color: [f64; 3]) -> f64 {
        let terms: Vec<f64> = self
            .components
            .iter()
            .filter(|c| c.weight > 0.0)
            .map(|c| c.weight.ln() + component_log_density(c, color))
            .collect();
        let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return -f64::MIN_POSITIVE.ln();
        }
        let sum: f64 = terms.iter().map(|t| (t - max).exp()).sum();
        -(max + sum.ln())
    }
}

fn component_density(component: &Component, color: [f64; 3]) -> f64 {
    component_log_density(component, color).exp()
}

fn component_log_density(component: &Component, color: [f64; 3]) -> f64 {
    let d = [
        color[0] - component.mean[0],
        color[1] - component.mean[1],
        color[2] - component.mean[2],
    ];
    let inv = &component.inverse_covariance;
    let mut mahalanobis = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            mahalanobis += d[i] * inv[i][j] * d[j];
        }
    }
    component.norm.ln() - 0.5 * mahalanobis
}

fn determinant(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse(m: &[[f64; 3]; 3], det: f64) -> [[f64; 3]; 3] {
    let inv_det = 1.0 / det;
    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

fn squared_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Lloyd's k-means with farthest-point seeding; returns a label per sample
fn kmeans(samples: &[[f64; 3]], k: usize, iterations: usize) -> Vec<usize> {
    let Some(&first) = samples.first() else {
        return Vec::new();
    };

    let mut centers = vec![first];
    let mut nearest: Vec<f64> = samples.iter().map(|s| squared_distance(*s, first)).collect();
    while centers.len() < k {
        let Some((index, _)) = nearest
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            break;
        };
        let Some(&center) = samples.get(index) else {
            break;
        };
        centers.push(center);
        for (distance, sample) in nearest.iter_mut().zip(samples) {
            *distance = distance.min(squared_distance(*sample, center));
        }
    }

    let assign = |centers: &[[f64; 3]], labels: &mut [usize]| {
        for (label, sample) in labels.iter_mut().zip(samples) {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (index, center) in centers.iter().enumerate() {
                let distance = squared_distance(*sample, *center);
                if distance < best_distance {
                    best_distance = distance;
                    best = index;
                }
            }
            *label = best;
        }
    };

    let mut labels = vec![0; samples.len()];
    for _ in 0..iterations {
        assign(centers.as_slice(), labels.as_mut_slice());

        let mut sums = vec![([0.0; 3], 0usize); centers.len()];
        for (sample, &label) in samples.iter().zip(&labels) {
            if let Some((sum, count)) = sums.get_mut(label) {
                for c in 0..3 {
                    sum[c] += sample[c];
                }
                *count += 1;
            }
        }
        for (center, (sum, count)) in centers.iter_mut().zip(sums) {
            if count > 0 {
                let n = count as f64;
                *center = [sum[0] / n, sum[1] / n, sum[2] / n];
            }
        }
    }
    assign(centers.as_slice(), labels.as_mut_slice());

    labels
}
