use sysinfo::System;

use crate::models::Vitals;

pub trait VitalsSource: Send + Sync {
    fn sample(&mut self) -> Vitals;
}

/// Host CPU and memory usage via sysinfo. CPU usage is a delta between
/// refreshes, so the collector lives as long as the loop.
pub struct SystemVitals {
    system: System,
}

impl SystemVitals {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        Self { system }
    }
}

impl Default for SystemVitals {
    fn default() -> Self {
        Self::new()
    }
}

impl VitalsSource for SystemVitals {
    fn sample(&mut self) -> Vitals {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let ram_percent = if total == 0 {
            0.0
        } else {
            (self.system.used_memory() as f64 / total as f64 * 100.0) as f32
        };

        Vitals {
            cpu_percent: self.system.global_cpu_info().cpu_usage(),
            ram_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_are_in_range() {
        let mut vitals = SystemVitals::new();
        let sample = vitals.sample();
        assert!(sample.cpu_percent >= 0.0);
        assert!((0.0..=100.0).contains(&sample.ram_percent));
    }
}
