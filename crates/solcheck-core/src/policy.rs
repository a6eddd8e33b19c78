use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, SolcheckError};

fn config_error(code: &str, message: impl Into<String>) -> SolcheckError {
    SolcheckError::Config(ErrorInfo::new(code, message.into()))
}

/// Tolerance and sampling policy controlling every verifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    /// Master seed for numeric sampling; verifiers derive substreams from it.
    #[serde(default = "Policy::default_seed")]
    pub seed: u64,
    /// Number of points sampled when corroborating derivative and integral residuals.
    #[serde(default = "Policy::default_sample_count")]
    pub sample_count: usize,
    /// Absolute tolerance on sampled residuals.
    #[serde(default = "Policy::default_sample_tol")]
    pub sample_tol: f64,
    /// Absolute tolerance on the residual of a declared root.
    #[serde(default = "Policy::default_root_tol")]
    pub root_tol: f64,
    /// Offsets from the limit point used for numeric corroboration.
    #[serde(default = "Policy::default_limit_eps")]
    pub limit_eps: Vec<f64>,
    /// Absolute tolerance between sampled values and the declared limit.
    #[serde(default = "Policy::default_limit_tol")]
    pub limit_tol: f64,
    /// Tolerance on the optimum coordinate.
    #[serde(default = "Policy::default_x_tol")]
    pub x_tol: f64,
    /// Tolerance on the optimum value.
    #[serde(default = "Policy::default_f_tol")]
    pub f_tol: f64,
    /// Slack granted to `expr <= 0` constraints.
    #[serde(default = "Policy::default_feasibility_tol")]
    pub feasibility_tol: f64,
    /// Number of random neighbours drawn by the multi-variable local search.
    #[serde(default = "Policy::default_local_search_iterations")]
    pub local_search_iterations: usize,
    /// Half-width of the perturbation applied to each coordinate.
    #[serde(default = "Policy::default_local_search_radius")]
    pub local_search_radius: f64,
    /// Improvement over the declared optimum that counts as a counterexample.
    #[serde(default = "Policy::default_improvement_tol")]
    pub improvement_tol: f64,
    /// Tolerance on the recomputed correlation coefficient.
    #[serde(default = "Policy::default_corr_tol")]
    pub corr_tol: f64,
    /// Tolerance on the recomputed regression slope.
    #[serde(default = "Policy::default_slope_tol")]
    pub slope_tol: f64,
    /// Minimum number of literals the statement must contain for the regression check.
    #[serde(default = "Policy::default_stat_min_numbers")]
    pub stat_min_numbers: usize,
    /// Number of trailing literals treated as the y-series.
    #[serde(default = "Policy::default_stat_series_len")]
    pub stat_series_len: usize,
    /// Minimum statement length accepted by the structural check.
    #[serde(default = "Policy::default_min_statement_chars")]
    pub min_statement_chars: usize,
    /// The normalizer pads statements shorter than this many characters.
    #[serde(default = "Policy::default_pad_below_chars")]
    pub pad_below_chars: usize,
    /// Clause appended to short statements by the normalizer.
    #[serde(default = "Policy::default_pad_clause")]
    pub pad_clause: String,
}

impl Policy {
    const fn default_seed() -> u64 {
        0x5eed_0001
    }

    const fn default_sample_count() -> usize {
        6
    }

    const fn default_sample_tol() -> f64 {
        1e-5
    }

    const fn default_root_tol() -> f64 {
        1e-6
    }

    fn default_limit_eps() -> Vec<f64> {
        vec![1e-2, 1e-3, 1e-4]
    }

    const fn default_limit_tol() -> f64 {
        1e-2
    }

    const fn default_x_tol() -> f64 {
        1e-3
    }

    const fn default_f_tol() -> f64 {
        1e-2
    }

    const fn default_feasibility_tol() -> f64 {
        1e-6
    }

    const fn default_local_search_iterations() -> usize {
        40
    }

    const fn default_local_search_radius() -> f64 {
        0.5
    }

    const fn default_improvement_tol() -> f64 {
        1e-3
    }

    const fn default_corr_tol() -> f64 {
        0.05
    }

    const fn default_slope_tol() -> f64 {
        0.2
    }

    const fn default_stat_min_numbers() -> usize {
        8
    }

    const fn default_stat_series_len() -> usize {
        5
    }

    const fn default_min_statement_chars() -> usize {
        40
    }

    const fn default_pad_below_chars() -> usize {
        45
    }

    fn default_pad_clause() -> String {
        " (Donner la réponse finale et vérifier.)".to_string()
    }

    /// Parses a policy from YAML bytes and validates it.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, SolcheckError> {
        let policy: Policy = serde_yaml::from_slice(bytes)
            .map_err(|err| config_error("policy_yaml", err.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Reads and validates a YAML policy file.
    pub fn from_yaml_path(path: &Path) -> Result<Self, SolcheckError> {
        let bytes = fs::read(path).map_err(|err| {
            SolcheckError::Config(
                ErrorInfo::new("policy_read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_slice(&bytes)
    }

    /// Rejects tolerances that would make every check vacuous or impossible.
    pub fn validate(&self) -> Result<(), SolcheckError> {
        let tolerances = [
            ("sample_tol", self.sample_tol),
            ("root_tol", self.root_tol),
            ("limit_tol", self.limit_tol),
            ("x_tol", self.x_tol),
            ("f_tol", self.f_tol),
            ("feasibility_tol", self.feasibility_tol),
            ("local_search_radius", self.local_search_radius),
            ("improvement_tol", self.improvement_tol),
            ("corr_tol", self.corr_tol),
            ("slope_tol", self.slope_tol),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value > 0.0) {
                return Err(SolcheckError::Config(
                    ErrorInfo::new("policy_tolerance", "tolerances must be finite and positive")
                        .with_context("field", name)
                        .with_context("value", value.to_string()),
                ));
            }
        }
        if self.limit_eps.is_empty() {
            return Err(config_error(
                "policy_limit_eps",
                "limit_eps must contain at least one offset",
            ));
        }
        if self.limit_eps.iter().any(|eps| !(eps.is_finite() && *eps > 0.0)) {
            return Err(config_error(
                "policy_limit_eps",
                "limit offsets must be finite and positive",
            ));
        }
        if self.sample_count == 0 {
            return Err(SolcheckError::Config(
                ErrorInfo::new("policy_sample_count", "sample_count must be at least one")
                    .with_hint("the default policy samples 6 points"),
            ));
        }
        if self.stat_series_len < 2 {
            return Err(config_error(
                "policy_stat_series",
                "stat_series_len must be at least two",
            ));
        }
        Ok(())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            seed: Self::default_seed(),
            sample_count: Self::default_sample_count(),
            sample_tol: Self::default_sample_tol(),
            root_tol: Self::default_root_tol(),
            limit_eps: Self::default_limit_eps(),
            limit_tol: Self::default_limit_tol(),
            x_tol: Self::default_x_tol(),
            f_tol: Self::default_f_tol(),
            feasibility_tol: Self::default_feasibility_tol(),
            local_search_iterations: Self::default_local_search_iterations(),
            local_search_radius: Self::default_local_search_radius(),
            improvement_tol: Self::default_improvement_tol(),
            corr_tol: Self::default_corr_tol(),
            slope_tol: Self::default_slope_tol(),
            stat_min_numbers: Self::default_stat_min_numbers(),
            stat_series_len: Self::default_stat_series_len(),
            min_statement_chars: Self::default_min_statement_chars(),
            pad_below_chars: Self::default_pad_below_chars(),
            pad_clause: Self::default_pad_clause(),
        }
    }
}
