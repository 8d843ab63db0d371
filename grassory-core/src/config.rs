//! Per-call options.

/// Options threaded explicitly through every operation that validates or truncates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradedConfig {
    /// Skip the checkerboard check of the parity-block decomposition.
    pub skip_grading_check: bool,
    /// Allow fermionic axes whose dimension is not a power of two.
    pub skip_power_of_two_check: bool,
    /// Relative magnitude below which singular values and eigenvalues are dropped, and absolute
    /// magnitude below which sparse entries are removed.
    pub numeric_cutoff: f64,
    /// Upper bound of the averaged odd-checkerboard weight accepted by the grading check.
    pub grading_tolerance: f64,
}

impl Default for GradedConfig {
    fn default() -> Self {
        GradedConfig {
            skip_grading_check: false,
            skip_power_of_two_check: false,
            numeric_cutoff: 1e-14,
            grading_tolerance: 1e-14,
        }
    }
}

impl GradedConfig {
    /// Sets `skip_grading_check`.
    pub fn skip_grading_check(self, skip: bool) -> Self {
        GradedConfig {
            skip_grading_check: skip,
            ..self
        }
    }
    /// Sets `skip_power_of_two_check`.
    pub fn skip_power_of_two_check(self, skip: bool) -> Self {
        GradedConfig {
            skip_power_of_two_check: skip,
            ..self
        }
    }
    /// Sets `numeric_cutoff`.
    pub fn numeric_cutoff(self, cutoff: f64) -> Self {
        GradedConfig {
            numeric_cutoff: cutoff,
            ..self
        }
    }
    /// Sets `grading_tolerance`.
    pub fn grading_tolerance(self, tolerance: f64) -> Self {
        GradedConfig {
            grading_tolerance: tolerance,
            ..self
        }
    }
}
