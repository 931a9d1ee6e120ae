use chrono::NaiveDateTime;
use std::path::Path;

use crate::error::Result;
use crate::models::{PollResult, Status, Target, Vitals};
use crate::utils::write_atomic;

/// Renders the Markdown status report. Pure: same inputs, same bytes.
///
/// Rows follow `targets` order; disabled targets are left out. A target with no
/// recorded outcome is shown as down.
pub fn render(results: &PollResult, targets: &[Target], vitals: &Vitals, timestamp: NaiveDateTime) -> String {
    let mut lines = vec![
        "# 🦅 Talon Handler Dashboard".to_string(),
        format!("**Last Updated:** `{}`", timestamp.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "## 🚀 System Vitals".to_string(),
        format!("- **CPU Usage:** `{:.1}%`", vitals.cpu_percent),
        format!("- **RAM Usage:** `{:.1}%`", vitals.ram_percent),
        String::new(),
        "## 📡 Service Status".to_string(),
        "| Service | Port | Status |".to_string(),
        "| :--- | :--- | :--- |".to_string(),
    ];

    for target in targets.iter().filter(|t| t.enabled) {
        let status = Status::from_up(results.get(target.port).unwrap_or(false));
        lines.push(format!("| {} | {} | {} |", target.display_name, target.port, status.badge()));
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

/// Replaces the report file in full.
pub fn write(path: &Path, report: &str) -> Result<()> {
    write_atomic(path, report.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 30, 5).unwrap()
    }

    fn target(port: u16, name: &str, enabled: bool) -> Target {
        Target { port, display_name: name.to_string(), enabled }
    }

    #[test]
    fn renders_enabled_rows_in_order() {
        let targets = vec![
            target(8096, "Jellyfin", true),
            target(7878, "Radarr", false),
            target(22, "SSH", true),
        ];
        let mut results = PollResult::new();
        results.record(8096, true);
        results.record(22, false);
        let vitals = Vitals { cpu_percent: 12.5, ram_percent: 40.3 };

        let report = render(&results, &targets, &vitals, at());
        let expected = "\
# 🦅 Talon Handler Dashboard
**Last Updated:** `2024-05-01 12:30:05`

## 🚀 System Vitals
- **CPU Usage:** `12.5%`
- **RAM Usage:** `40.3%`

## 📡 Service Status
| Service | Port | Status |
| :--- | :--- | :--- |
| Jellyfin | 8096 | ✅ UP |
| SSH | 22 | ❌ DOWN |
";
        assert_eq!(report, expected);
        assert!(!report.contains("7878"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let targets = vec![target(443, "HTTPS", true), target(80, "HTTP", true)];
        let mut results = PollResult::new();
        results.record(443, true);
        results.record(80, true);
        let vitals = Vitals { cpu_percent: 3.0, ram_percent: 70.0 };

        let first = render(&results, &targets, &vitals, at());
        let second = render(&results, &targets, &vitals, at());
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn missing_outcome_shows_down() {
        let targets = vec![target(9000, "Portainer", true)];
        let report = render(&PollResult::new(), &targets, &Vitals::default(), at());
        assert!(report.contains("| Portainer | 9000 | ❌ DOWN |"));
    }

    #[test]
    fn write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talon_dashboard.md");
        write(&path, "old").unwrap();
        write(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
