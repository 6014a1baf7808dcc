/// Risk band for a PR, relative to the riskiest PR in the same report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Band a relative risk percentage (0-100).
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 66.0 {
            RiskLevel::High
        } else if percent >= 33.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// What the report shows about a single pull request.
#[derive(Debug, Clone)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub url: String,
    /// Risk in [0, 1]
    pub risk: f64,
    /// Risk as a percentage of the column maximum; None when the maximum is zero
    pub relative_risk: Option<f64>,
    pub missing_changelog: bool,
    pub docs_only: bool,
    pub needs_info: bool,
}

impl PrSummary {
    pub fn level(&self) -> Option<RiskLevel> {
        self.relative_risk.map(RiskLevel::from_percent)
    }

    /// Short tags for the boolean flags, in display order.
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.missing_changelog {
            flags.push("missing changelog");
        }
        if self.docs_only {
            flags.push("docs only");
        }
        if self.needs_info {
            flags.push("needs info");
        }
        flags
    }
}

/// A backport and its most likely original.
#[derive(Debug, Clone)]
pub struct BackportRow {
    pub backport: PrSummary,
    pub original: Option<PrSummary>,
}

#[derive(Debug, Clone)]
pub struct VersionSection {
    /// Release line, e.g. "2.10"
    pub version: String,
    pub rows: Vec<BackportRow>,
}

/// Complete report over every requested release line.
#[derive(Debug)]
pub struct Report {
    pub sections: Vec<VersionSection>,
    pub max_risk: f64,
    pub max_original_risk: f64,
}
