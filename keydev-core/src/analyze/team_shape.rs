//! Balanced vs hero team classification from the jack-score distribution.

use serde::Serialize;

use super::stats::{ks_uniform, shapiro_wilk, skewness};
use crate::config::TeamShapeSection;
use crate::types::TeamShape;

/// Outcome of the three distribution checks on one set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeEvidence {
    /// KS p-value against U(0, 1).
    pub uniform_p: f64,
    /// Shapiro-Wilk p-value; `None` with fewer than three scores.
    pub normal_p: Option<f64>,
    /// Biased sample skewness (NaN for constant scores).
    pub skewness: f64,
}

impl ShapeEvidence {
    pub fn measure(scores: &[f64]) -> Self {
        Self {
            uniform_p: ks_uniform(scores).map_or(0.0, |r| r.p_value),
            normal_p: shapiro_wilk(scores).map(|r| r.p_value),
            skewness: skewness(scores),
        }
    }

    pub fn is_uniform(&self, alpha: f64) -> bool {
        self.uniform_p > alpha
    }

    pub fn is_normal(&self, alpha: f64) -> bool {
        self.normal_p.is_some_and(|p| p > alpha)
    }

    /// NaN skewness never counts as "not right-skewed".
    pub fn is_not_right_skewed(&self, limit: f64) -> bool {
        self.skewness < limit
    }

    pub fn shape(&self, config: &TeamShapeSection) -> TeamShape {
        if self.is_uniform(config.alpha)
            || self.is_normal(config.alpha)
            || self.is_not_right_skewed(config.skewness_limit)
        {
            TeamShape::Balanced
        } else {
            TeamShape::Hero
        }
    }
}

/// Classify a team from one score per developer (zeros included).
///
/// `None` below `config.min_developers` scores.
pub fn classify(scores: &[f64], config: &TeamShapeSection) -> Option<TeamShape> {
    if scores.len() < config.min_developers.max(1) {
        return None;
    }
    Some(ShapeEvidence::measure(scores).shape(config))
}
