//! Engine configuration, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level keydev configuration, matching `keydev.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeydevConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub team_shape: TeamShapeSection,
}

impl KeydevConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with the given sliding window size and defaults elsewhere.
    pub fn with_window_size(size_days: u32) -> Self {
        Self {
            window: WindowSection { size_days },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.size_days == 0 {
            return Err(ConfigError::Invalid(
                "window.size_days must be at least 1".into(),
            ));
        }
        if self.graph.distance_limit.is_nan() || self.graph.distance_limit <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "graph.distance_limit must be positive, got {}",
                self.graph.distance_limit
            )));
        }
        let coverage = self.scoring.pareto_coverage;
        if coverage.is_nan() || coverage <= 0.0 || coverage > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scoring.pareto_coverage must be in (0, 1], got {coverage}"
            )));
        }
        let alpha = self.team_shape.alpha;
        if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "team_shape.alpha must be in (0, 1), got {alpha}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSection {
    /// Number of days kept in the artifact graph.
    pub size_days: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self { size_days: 365 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSection {
    /// Accumulated distance above which reachability stops expanding.
    pub distance_limit: f64,
    /// Change sets including more files than this are left out of the graph.
    pub large_change_set_limit: usize,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            distance_limit: 10.0,
            large_change_set_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSection {
    /// Scores below this value are treated as zero and dropped.
    pub score_threshold: f64,
    /// Coverage the "significant few" have to reach.
    pub pareto_coverage: f64,
    /// Replacement needs at least this many other developers in the window.
    pub min_replacement_candidates: usize,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            score_threshold: 0.000_005,
            pareto_coverage: 0.8,
            min_replacement_candidates: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamShapeSection {
    /// Below this many developers the team shape is undefined.
    pub min_developers: usize,
    /// Significance level of the normality and uniformity tests.
    pub alpha: f64,
    /// A jack-score distribution skewed at or above this is right-skewed.
    pub skewness_limit: f64,
}

impl Default for TeamShapeSection {
    fn default() -> Self {
        Self {
            min_developers: 3,
            alpha: 0.05,
            skewness_limit: 1.0,
        }
    }
}
