/// Signals from the hosting environment that the exam view was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegritySignal {
    VisibilityLost,
    FocusLost,
}

/// Observes integrity signals and raises a single warning flag.
///
/// The monitor only reacts while armed. Repeated violations collapse into the
/// one flag until it is acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityMonitor {
    armed: bool,
    warning: bool,
}

impl IntegrityMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Stop reacting to signals. An active warning stays until acknowledged.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns `true` if the signal raised the warning (it may already have been raised).
    pub fn observe(&mut self, _signal: IntegritySignal) -> bool {
        if !self.armed {
            return false;
        }
        self.warning = true;
        true
    }

    pub fn acknowledge(&mut self) {
        self.warning = false;
    }

    #[must_use]
    pub fn warning_active(&self) -> bool {
        self.warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_violations_collapse_into_one_flag() {
        let mut monitor = IntegrityMonitor::new();
        monitor.arm();
        assert!(monitor.observe(IntegritySignal::VisibilityLost));
        assert!(monitor.observe(IntegritySignal::FocusLost));
        assert!(monitor.warning_active());

        monitor.acknowledge();
        assert!(!monitor.warning_active());
    }

    #[test]
    fn disarmed_monitor_ignores_signals() {
        let mut monitor = IntegrityMonitor::new();
        assert!(!monitor.observe(IntegritySignal::FocusLost));
        assert!(!monitor.warning_active());

        monitor.arm();
        monitor.observe(IntegritySignal::FocusLost);
        monitor.disarm();
        assert!(monitor.warning_active());
        assert!(!monitor.observe(IntegritySignal::VisibilityLost));
    }
}
