//! Robust statistics and curve fitting shared by the denoising and trend
//! stages. Everything operates on plain f64 slices; fits that go singular or
//! non-finite report `None` and the caller degrades.

use serde::{Deserialize, Serialize};

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation: median of |x - median(x)|.
pub fn mad(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Ordinary least squares line fit. `None` when fewer than 2 points or the
/// x values are all equal.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let sum_x: f64 = xs[..n].iter().sum();
    let sum_y: f64 = ys[..n].iter().sum();
    let sum_xx: f64 = xs[..n].iter().map(|x| x * x).sum();
    let sum_xy: f64 = xs[..n].iter().zip(&ys[..n]).map(|(x, y)| x * y).sum();

    let denom = n_f * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let slope = (n_f * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n_f;
    if slope.is_finite() && intercept.is_finite() {
        Some((slope, intercept))
    } else {
        None
    }
}

/// Coefficient of determination for a fitted line.
pub fn r_squared(xs: &[f64], ys: &[f64], slope: f64, intercept: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_y: f64 = ys[..n].iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = ys[..n].iter().map(|y| (y - mean_y).powi(2)).sum();
    if ss_tot < f64::EPSILON {
        return 1.0;
    }
    let ss_res: f64 = xs[..n]
        .iter()
        .zip(&ys[..n])
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Gaussian elimination with partial pivoting over an augmented matrix.
/// Returns the solution vector, or `None` on a singular system.
fn solve_linear_system(mut matrix: Vec<Vec<f64>>) -> Option<Vec<f64>> {
    let n = matrix.len();
    for col in 0..n {
        // Pivot: largest absolute value in this column, at or below the diagonal.
        let pivot_row = (col..n)
            .max_by(|&a, &b| {
                matrix[a][col]
                    .abs()
                    .partial_cmp(&matrix[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if matrix[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=n {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let mut value = matrix[row][n];
        for col in (row + 1)..n {
            value -= matrix[row][col] * solution[col];
        }
        solution[row] = value / matrix[row][row];
        if !solution[row].is_finite() {
            return None;
        }
    }
    Some(solution)
}

/// Polynomial least squares via normal equations. Coefficients are low-order
/// first, padded with zeros up to cubic. The degree drops to 1 when there
/// are fewer than 4 support points; `None` on a singular system.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<[f64; 4]> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mut degree = degree.min(3);
    if n < 4 {
        degree = degree.min(1);
    }
    if n <= degree {
        degree = n - 1;
    }

    let terms = degree + 1;
    let mut matrix = vec![vec![0.0; terms + 1]; terms];
    for row in 0..terms {
        for col in 0..terms {
            matrix[row][col] = xs[..n].iter().map(|x| x.powi((row + col) as i32)).sum();
        }
        matrix[row][terms] = xs[..n]
            .iter()
            .zip(&ys[..n])
            .map(|(x, y)| x.powi(row as i32) * y)
            .sum();
    }

    let solution = solve_linear_system(matrix)?;
    let mut coefficients = [0.0; 4];
    for (slot, value) in coefficients.iter_mut().zip(solution.iter()) {
        if !value.is_finite() {
            return None;
        }
        *slot = *value;
    }
    Some(coefficients)
}

/// Tri-cube kernel weight for a point at distance `d` under bandwidth `bw`.
fn tricube(d: f64, bw: f64) -> f64 {
    if bw <= 0.0 || d >= bw {
        return 0.0;
    }
    let u = d / bw;
    (1.0 - u.powi(3)).powi(3)
}

/// A reference curve fitted to candidate extrema. Used only to score
/// residuals inside the denoising engine and discarded after use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedCurve {
    Polynomial { coefficients: [f64; 4] },
    LocalRegression { bandwidth: f64, samples: Vec<(f64, f64)> },
}

impl FittedCurve {
    pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Option<Self> {
        polyfit(xs, ys, degree).map(|coefficients| FittedCurve::Polynomial { coefficients })
    }

    /// Tri-cube-weighted local averaging; `bandwidth_fraction` is relative
    /// to the x span of the samples.
    pub fn fit_local(xs: &[f64], ys: &[f64], bandwidth_fraction: f64) -> Option<Self> {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return None;
        }
        let span = xs[n - 1] - xs[0];
        let bandwidth = span.abs() * bandwidth_fraction;
        if bandwidth <= 0.0 || !bandwidth.is_finite() {
            return None;
        }
        let samples = xs[..n].iter().copied().zip(ys[..n].iter().copied()).collect();
        Some(FittedCurve::LocalRegression { bandwidth, samples })
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            FittedCurve::Polynomial { coefficients } => coefficients
                .iter()
                .enumerate()
                .map(|(power, c)| c * x.powi(power as i32))
                .sum(),
            FittedCurve::LocalRegression { bandwidth, samples } => {
                let mut weight_sum = 0.0;
                let mut value_sum = 0.0;
                for &(sx, sy) in samples {
                    let w = tricube((x - sx).abs(), *bandwidth);
                    weight_sum += w;
                    value_sum += w * sy;
                }
                if weight_sum > 0.0 {
                    value_sum / weight_sum
                } else {
                    // Outside every kernel: nearest sample wins.
                    samples
                        .iter()
                        .min_by(|a, b| {
                            (a.0 - x)
                                .abs()
                                .partial_cmp(&(b.0 - x).abs())
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .map(|&(_, sy)| sy)
                        .unwrap_or(0.0)
                }
            }
        }
    }

    pub fn rmse(&self, xs: &[f64], ys: &[f64]) -> f64 {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return f64::INFINITY;
        }
        let sum: f64 = xs[..n]
            .iter()
            .zip(&ys[..n])
            .map(|(x, y)| (y - self.eval(*x)).powi(2))
            .sum();
        (sum / n as f64).sqrt()
    }
}
