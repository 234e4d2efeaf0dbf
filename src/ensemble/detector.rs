use std::fmt::Debug;

/// A detector fed with one error signal per example: `0.0` for a correct
/// prediction, `1.0` for a mistake.
pub trait ChangeDetector: Debug + Send {
    fn input(&mut self, error: f64);

    fn has_changed(&self) -> bool;

    fn in_warning_zone(&self) -> bool;

    fn reset(&mut self);

    fn boxed_clone(&self) -> Box<dyn ChangeDetector>;
}

/// Drift state derived from a detector after each example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftLevel {
    #[default]
    InControl,
    Warning,
    Change,
}

impl DriftLevel {
    pub fn observe(detector: &dyn ChangeDetector) -> Self {
        if detector.has_changed() {
            DriftLevel::Change
        } else if detector.in_warning_zone() {
            DriftLevel::Warning
        } else {
            DriftLevel::InControl
        }
    }
}

/// Drift Detection Method (Gama et al., 2004).
///
/// Tracks the error rate `p` and its deviation `s`. Once `min_observations`
/// signals were seen, a warning is raised when `p + s` exceeds the recorded
/// minimum by `warning_level` deviations and a change when it exceeds it by
/// `change_level` deviations. The detector restarts on the input following a
/// change.
#[derive(Debug, Clone)]
pub struct Ddm {
    min_observations: u64,
    warning_level: f64,
    change_level: f64,
    n: u64,
    p: f64,
    s: f64,
    p_min: f64,
    s_min: f64,
    change: bool,
    warning: bool,
}

impl Ddm {
    pub fn new(min_observations: u64, warning_level: f64, change_level: f64) -> Self {
        let mut ddm = Self {
            min_observations,
            warning_level,
            change_level,
            n: 1,
            p: 1.0,
            s: 0.0,
            p_min: f64::MAX,
            s_min: f64::MAX,
            change: false,
            warning: false,
        };
        ddm.reset();
        ddm
    }

    /// Current error rate estimate.
    pub fn estimation(&self) -> f64 {
        self.p
    }
}

impl Default for Ddm {
    fn default() -> Self {
        Self::new(30, 2.0, 3.0)
    }
}

impl ChangeDetector for Ddm {
    fn input(&mut self, error: f64) {
        if self.change {
            self.reset();
        }

        self.p += (error - self.p) / self.n as f64;
        self.s = (self.p * (1.0 - self.p) / self.n as f64).sqrt();
        self.n += 1;
        self.change = false;
        self.warning = false;

        if self.n < self.min_observations {
            return;
        }

        if self.p + self.s <= self.p_min + self.s_min {
            self.p_min = self.p;
            self.s_min = self.s;
        }

        if self.n > self.min_observations
            && self.p + self.s > self.p_min + self.change_level * self.s_min
        {
            self.change = true;
        } else if self.p + self.s > self.p_min + self.warning_level * self.s_min {
            self.warning = true;
        }
    }

    fn has_changed(&self) -> bool {
        self.change
    }

    fn in_warning_zone(&self) -> bool {
        self.warning
    }

    fn reset(&mut self) {
        self.n = 1;
        self.p = 1.0;
        self.s = 0.0;
        self.p_min = f64::MAX;
        self.s_min = f64::MAX;
        self.change = false;
        self.warning = false;
    }

    fn boxed_clone(&self) -> Box<dyn ChangeDetector> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_stream_stays_in_control() {
        let mut ddm = Ddm::default();
        for i in 0..1000 {
            ddm.input(if i % 10 == 0 { 1.0 } else { 0.0 });
            assert!(!ddm.has_changed());
        }
    }

    #[test]
    fn test_error_burst_signals_change() {
        let mut ddm = Ddm::default();
        for i in 0..500 {
            ddm.input(if i % 20 == 0 { 1.0 } else { 0.0 });
        }

        let mut levels = Vec::new();
        for _ in 0..200 {
            ddm.input(1.0);
            levels.push(DriftLevel::observe(&ddm));
            if ddm.has_changed() {
                break;
            }
        }

        assert_eq!(levels.last(), Some(&DriftLevel::Change));
        assert!(levels.contains(&DriftLevel::Warning));
    }

    #[test]
    fn test_restarts_after_change() {
        let mut ddm = Ddm::default();
        for _ in 0..100 {
            ddm.input(0.0);
        }
        while !ddm.has_changed() {
            ddm.input(1.0);
        }
        ddm.input(0.0);
        assert!(!ddm.has_changed());
        assert!(!ddm.in_warning_zone());
    }
}
