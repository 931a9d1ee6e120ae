use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
}

impl Status {
    pub fn from_up(is_up: bool) -> Self {
        if is_up { Status::Up } else { Status::Down }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Status::Up => "✅ UP",
            Status::Down => "❌ DOWN",
        }
    }
}

/// A monitored endpoint on the local host, keyed by port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub port: u16,
    pub display_name: String,
    pub enabled: bool,
}

/// Probe outcomes for one cycle, in watchlist order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResult {
    outcomes: Vec<(u16, bool)>,
}

impl PollResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, port: u16, is_up: bool) {
        match self.outcomes.iter_mut().find(|(p, _)| *p == port) {
            Some(entry) => entry.1 = is_up,
            None => self.outcomes.push((port, is_up)),
        }
    }

    pub fn get(&self, port: u16) -> Option<bool> {
        self.outcomes.iter().find(|(p, _)| *p == port).map(|(_, up)| *up)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, bool)> + '_ {
        self.outcomes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn up_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, up)| *up).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Down,
    Recovered,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Down => write!(f, "DOWN"),
            AlertKind::Recovered => write!(f, "RECOVERED"),
        }
    }
}

/// A state transition worth telling a human about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub port: u16,
    pub kind: AlertKind,
    pub strikes: u32,
}

impl AlertEvent {
    pub fn message(&self, name: &str) -> String {
        match self.kind {
            AlertKind::Down => format!(
                "⚠️ ALERT: Service '{}' on port {} is DOWN ({} consecutive failures).",
                name, self.port, self.strikes
            ),
            AlertKind::Recovered => format!(
                "✅ RECOVERED: Service '{}' on port {} is back UP.",
                name, self.port
            ),
        }
    }
}

/// Host resource usage shown alongside service status.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vitals {
    pub cpu_percent: f32,
    pub ram_percent: f32,
}
