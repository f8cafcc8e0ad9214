//! Distribution tests used by the team-shape classifier.
//!
//! Shapiro-Wilk follows Royston's AS R94 approximation, the KS p-value uses the
//! Marsaglia-Tsang-Wang matrix method for the exact two-sided distribution.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]

use std::f64::consts::{FRAC_PI_3, PI, SQRT_2};

/// Statistic and p-value of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

// ── Moments ────────────────────────────────────────────────────────

pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Biased sample skewness `m3 / m2^1.5`. NaN for empty or constant samples.
pub fn skewness(sample: &[f64]) -> f64 {
    let n = sample.len() as f64;
    let mu = mean(sample);
    if mu.is_nan() {
        return f64::NAN;
    }
    let m2 = sample.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / n;
    let m3 = sample.iter().map(|x| (x - mu).powi(3)).sum::<f64>() / n;
    if m2 <= (1e-15 * mu).powi(2) {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

// ── Normal distribution ────────────────────────────────────────────

/// Complementary error function (Chebyshev fit, |error| < 1.2e-7).
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let ans = t * (-z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
        .exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Upper tail `P(Z > z)` of the standard normal.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
pub fn normal_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

// ── Shapiro-Wilk ───────────────────────────────────────────────────

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk normality test. `None` below three observations.
///
/// A sample with (numerically) zero range returns `W = 1, p = 1`.
pub fn shapiro_wilk(sample: &[f64]) -> Option<TestResult> {
    const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
    const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
    const C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
    const C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
    const C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];
    const G: [f64; 2] = [-2.273, 0.459];
    const SMALL: f64 = 1e-19;

    let n = sample.len();
    if n < 3 {
        return None;
    }
    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);

    if x[n - 1] - x[0] < SMALL {
        return Some(TestResult {
            statistic: 1.0,
            p_value: 1.0,
        });
    }

    let an = n as f64;
    let half = n / 2;
    let mut a = vec![0.0_f64; half];
    if n == 3 {
        a[0] = 0.5_f64.sqrt();
    } else {
        let m: Vec<f64> = (1..=half)
            .map(|i| normal_ppf((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;
        a[0] = a1;

        let (first, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            a[1] = a2;
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        for (ai, mi) in a.iter_mut().zip(&m).skip(first) {
            *ai = -mi / fac;
        }
    }

    let mu = mean(&x);
    let ss: f64 = x.iter().map(|v| (v - mu).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ss).min(1.0);

    let p_value = if n == 3 {
        (6.0 / PI * (w.sqrt().asin() - FRAC_PI_3)).max(0.0)
    } else {
        let mut y = (1.0 - w).ln();
        let (m, s) = if n <= 11 {
            let gamma = poly(&G, an);
            if y >= gamma {
                return Some(TestResult {
                    statistic: w,
                    p_value: 1e-99,
                });
            }
            y = -(gamma - y).ln();
            (poly(&C3, an), poly(&C4, an).exp())
        } else {
            let ln_n = an.ln();
            (poly(&C5, ln_n), poly(&C6, ln_n).exp())
        };
        normal_sf((y - m) / s)
    };

    Some(TestResult {
        statistic: w,
        p_value: p_value.clamp(0.0, 1.0),
    })
}

// ── Kolmogorov-Smirnov against U(0, 1) ─────────────────────────────

/// Two-sided one-sample KS test against the standard uniform distribution.
/// `None` for an empty sample.
pub fn ks_uniform(sample: &[f64]) -> Option<TestResult> {
    let n = sample.len();
    if n == 0 {
        return None;
    }
    let mut x = sample.to_vec();
    x.sort_by(f64::total_cmp);

    let nf = n as f64;
    let d = x
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let cdf = v.clamp(0.0, 1.0);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);

    Some(TestResult {
        statistic: d,
        p_value: kolmogorov_sf(n, d),
    })
}

/// `P(D_n > d)` for the two-sided KS statistic.
pub fn kolmogorov_sf(n: usize, d: f64) -> f64 {
    let nf = n as f64;
    if d >= 1.0 {
        return 0.0;
    }
    if d * nf <= 0.5 {
        return 1.0;
    }
    (1.0 - kolmogorov_cdf(n, d)).clamp(0.0, 1.0)
}

/// Marsaglia-Tsang-Wang evaluation of `P(D_n < d)`.
fn kolmogorov_cdf(n: usize, d: f64) -> f64 {
    let nf = n as f64;
    let s = d * d * nf;
    if s > 7.24 || (s > 3.76 && n > 99) {
        return 1.0 - 2.0 * (-(2.000_071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
    }

    let k = (nf * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut hm = vec![0.0_f64; m * m];
    for i in 0..m {
        for j in 0..m {
            if i + 1 >= j {
                hm[i * m + j] = 1.0;
            }
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    hm[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, 0, m, n);
    let mut s = q[(k - 1) * m + k - 1];
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1e-140 {
            s *= 1e140;
            exponent -= 140;
        }
    }
    s * 10f64.powi(exponent)
}

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut c = vec![0.0_f64; m * m];
    for i in 0..m {
        for j in 0..m {
            c[i * m + j] = (0..m).map(|k| a[i * m + k] * b[k * m + j]).sum();
        }
    }
    c
}

/// `a^n` with a decimal exponent carried separately to avoid overflow.
fn matrix_power(a: &[f64], ea: i32, m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), ea);
    }
    let (v, ev) = matrix_power(a, ea, m, n / 2);
    let b = matrix_multiply(&v, &v, m);
    let eb = 2 * ev;
    let (mut v, mut ev) = if n % 2 == 0 {
        (b, eb)
    } else {
        (matrix_multiply(a, &b, m), ea + eb)
    };
    if v[(m / 2) * m + m / 2] > 1e140 {
        for x in &mut v {
            *x *= 1e-140;
        }
        ev += 140;
    }
    (v, ev)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skewness_of_symmetric_sample_is_zero() {
        assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-12);
        assert!(skewness(&[0.3, 0.3, 0.3]).is_nan());
        assert!(skewness(&[]).is_nan());
        // One large value skews right.
        assert!(skewness(&[0.0, 0.0, 0.0, 0.0, 1.0]) > 1.0);
    }

    #[test]
    fn normal_helpers_are_consistent() {
        assert!((normal_sf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_sf(1.959_964) - 0.025).abs() < 1e-6);
        assert!((normal_ppf(0.975) - 1.959_964).abs() < 1e-6);
        assert!((normal_ppf(0.01) + 2.326_348).abs() < 1e-6);
        assert!(normal_ppf(0.5).abs() < 1e-12);
        assert!((erfc(-1.0) - 1.842_700_79).abs() < 1e-6);
    }

    #[test]
    fn shapiro_wilk_needs_three_points() {
        assert!(shapiro_wilk(&[1.0, 2.0]).is_none());
        let flat = shapiro_wilk(&[2.0, 2.0, 2.0, 2.0]).unwrap();
        assert!((flat.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shapiro_wilk_three_equally_spaced_points() {
        let result = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((result.statistic - 1.0).abs() < 1e-9);
        assert!(result.p_value > 0.99);
    }

    #[test]
    fn shapiro_wilk_accepts_bell_shaped_sample() {
        let sample = [
            -1.6, -1.1, -0.8, -0.5, -0.3, -0.1, 0.0, 0.1, 0.3, 0.5, 0.8, 1.1, 1.6,
        ];
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.statistic > 0.95);
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn shapiro_wilk_rejects_heavy_outlier() {
        let sample = [0.01, 0.01, 0.02, 0.01, 0.02, 0.01, 0.9];
        let result = shapiro_wilk(&sample).unwrap();
        assert!(result.p_value < 0.05, "p = {}", result.p_value);
    }

    #[test]
    fn ks_statistic_on_small_sample() {
        let result = ks_uniform(&[0.1, 0.2, 0.3]).unwrap();
        // D = max(1/3 - 0.1, 2/3 - 0.2, 1 - 0.3) = 0.7
        assert!((result.statistic - 0.7).abs() < 1e-12);
        assert!(result.p_value < 0.1);
        assert!(ks_uniform(&[]).is_none());
    }

    #[test]
    fn ks_accepts_spread_sample() {
        let sample: Vec<f64> = (0..10).map(|i| (f64::from(i) + 0.5) / 10.0).collect();
        let result = ks_uniform(&sample).unwrap();
        assert!((result.statistic - 0.05).abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kolmogorov_distribution_known_value() {
        // P(D_1 > d) = 2(1 - d) for d in [0.5, 1].
        assert!((kolmogorov_sf(1, 0.7) - 0.6).abs() < 1e-9);
        assert!((kolmogorov_sf(5, 1.0)).abs() < f64::EPSILON);
        assert!((kolmogorov_sf(5, 0.05) - 1.0).abs() < f64::EPSILON);
        let p = kolmogorov_sf(10, 0.3);
        assert!(p > 0.2 && p < 0.35, "p = {p}");
    }
}
