//! Dashboard data handed to the assistant as prompt context.
//!
//! Rows come from the dashboard layer; this module only summarizes them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use intelplat_core::Role;

const TOP_CATEGORIES: usize = 3;
const RECENT_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub title: String,
    pub threat_type: String,
    pub severity: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub source_department: String,
    pub size_mb: f64,
    #[serde(default)]
    pub quality_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub title: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Rows from one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum DashboardContext {
    Incidents(Vec<Incident>),
    Datasets(Vec<Dataset>),
    Tickets(Vec<Ticket>),
}

impl DashboardContext {
    pub fn area(&self) -> &'static str {
        match self {
            DashboardContext::Incidents(_) => "cybersecurity",
            DashboardContext::Datasets(_) => "data_science",
            DashboardContext::Tickets(_) => "it_operations",
        }
    }

    /// Role whose dashboard these rows belong to.
    pub fn owner(&self) -> Role {
        match self {
            DashboardContext::Incidents(_) => Role::Cybersecurity,
            DashboardContext::Datasets(_) => Role::DataScience,
            DashboardContext::Tickets(_) => Role::ITOperations,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DashboardContext::Incidents(rows) => rows.is_empty(),
            DashboardContext::Datasets(rows) => rows.is_empty(),
            DashboardContext::Tickets(rows) => rows.is_empty(),
        }
    }

    /// Summary block appended to the user's prompt.
    pub fn render(&self) -> String {
        match self {
            DashboardContext::Incidents(rows) => render_incidents(rows),
            DashboardContext::Datasets(rows) => render_datasets(rows),
            DashboardContext::Tickets(rows) => render_tickets(rows),
        }
    }

    /// Short local summary used when the service cannot answer.
    pub fn fallback_summary(&self) -> String {
        match self {
            DashboardContext::Incidents(rows) if rows.is_empty() => "No incidents recorded.".to_string(),
            DashboardContext::Incidents(rows) => format!(
                "{} incidents, {} open, {} critical. Top threats: {}.",
                rows.len(),
                count_open(rows.iter().map(|r| r.status.as_str())),
                rows.iter().filter(|r| r.severity.eq_ignore_ascii_case("critical")).count(),
                top_counts(rows.iter().map(|r| r.threat_type.as_str())),
            ),
            DashboardContext::Datasets(rows) if rows.is_empty() => "No datasets registered.".to_string(),
            DashboardContext::Datasets(rows) => format!(
                "{} datasets, average quality {}, {:.1} MB in total.",
                rows.len(),
                average_quality(rows).map_or_else(|| "n/a".to_string(), |q| format!("{q:.1}/10")),
                rows.iter().map(|r| r.size_mb).sum::<f64>(),
            ),
            DashboardContext::Tickets(rows) if rows.is_empty() => "No tickets recorded.".to_string(),
            DashboardContext::Tickets(rows) => format!(
                "{} tickets, {} open. Top categories: {}.",
                rows.len(),
                count_open(rows.iter().map(|r| r.status.as_str())),
                top_counts(rows.iter().map(|r| r.category.as_str())),
            ),
        }
    }
}

fn render_incidents(rows: &[Incident]) -> String {
    let mut out = String::from("Current security incidents:\n");
    out.push_str(&format!("Total incidents: {}\n", rows.len()));
    out.push_str(&format!("Open incidents: {}\n", count_open(rows.iter().map(|r| r.status.as_str()))));
    out.push_str(&format!(
        "Critical incidents: {}\n",
        rows.iter().filter(|r| r.severity.eq_ignore_ascii_case("critical")).count()
    ));
    out.push_str(&format!("Top threat types: {}\n", top_counts(rows.iter().map(|r| r.threat_type.as_str()))));
    out.push_str("Recent incidents:\n");
    for r in most_recent(rows, |r| r.created_at) {
        out.push_str(&format!("- {}: {} - {}\n", r.title, r.severity, r.status));
    }
    out
}

fn render_datasets(rows: &[Dataset]) -> String {
    let mut out = String::from("Current datasets:\n");
    out.push_str(&format!("Total datasets: {}\n", rows.len()));
    if let Some(avg) = average_quality(rows) {
        out.push_str(&format!("Average quality score: {avg:.1}/10\n"));
    }
    out.push_str(&format!(
        "Total data size: {:.1} MB\n",
        rows.iter().map(|r| r.size_mb).sum::<f64>()
    ));
    out.push_str(&format!(
        "Top departments: {}\n",
        top_counts(rows.iter().map(|r| r.source_department.as_str()))
    ));
    out.push_str("Recent datasets:\n");
    for r in most_recent(rows, |r| r.created_at) {
        let quality = r.quality_score.map_or_else(|| "n/a".to_string(), |q| format!("{q:.1}"));
        out.push_str(&format!("- {}: quality {}/10\n", r.name, quality));
    }
    out
}

fn render_tickets(rows: &[Ticket]) -> String {
    let mut out = String::from("Current IT tickets:\n");
    out.push_str(&format!("Total tickets: {}\n", rows.len()));
    out.push_str(&format!("Open tickets: {}\n", count_open(rows.iter().map(|r| r.status.as_str()))));
    out.push_str(&format!(
        "Critical tickets: {}\n",
        rows.iter().filter(|r| r.priority.eq_ignore_ascii_case("critical")).count()
    ));
    out.push_str(&format!("Top categories: {}\n", top_counts(rows.iter().map(|r| r.category.as_str()))));
    out.push_str("Recent tickets:\n");
    for r in most_recent(rows, |r| r.created_at) {
        out.push_str(&format!("- {}: {} - {}\n", r.title, r.priority, r.status));
    }
    out
}

fn count_open<'a>(statuses: impl Iterator<Item = &'a str>) -> usize {
    statuses.filter(|s| s.eq_ignore_ascii_case("open")).count()
}

fn average_quality(rows: &[Dataset]) -> Option<f64> {
    let scores: Vec<f64> = rows.iter().filter_map(|r| r.quality_score).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

/// `"Phishing(3), Malware(2), DDoS(1)"`; ties break alphabetically.
fn top_counts<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if ranked.is_empty() {
        return "none".to_string();
    }
    ranked
        .into_iter()
        .take(TOP_CATEGORIES)
        .map(|(name, n)| format!("{name}({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn most_recent<T>(rows: &[T], at: impl Fn(&T) -> DateTime<Utc>) -> Vec<&T> {
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(at(r)));
    sorted.truncate(RECENT_ROWS);
    sorted
}

/// Canned questions shown to `role` in the assistant panel.
pub fn suggested_questions(role: Role) -> Vec<&'static str> {
    const CYBER: [&str; 4] = [
        "What are the most critical security incidents?",
        "Which threat types are most common?",
        "How many incidents are still open?",
        "What security recommendations do you have?",
    ];
    const DATA: [&str; 4] = [
        "What's the overall data quality score?",
        "Which datasets need improvement?",
        "Which departments have the best data quality?",
        "What data governance recommendations do you have?",
    ];
    const IT: [&str; 4] = [
        "What IT tickets need attention?",
        "Which categories have the most tickets?",
        "How many tickets are still open?",
        "What IT recommendations do you have?",
    ];
    const GENERAL: [&str; 3] = [
        "Give me a system health summary",
        "What are the top priorities?",
        "Any overall recommendations?",
    ];

    let mut out: Vec<&'static str> = match role {
        Role::Admin => CYBER.iter().chain(DATA.iter()).chain(IT.iter()).copied().collect(),
        Role::Cybersecurity => CYBER.to_vec(),
        Role::DataScience => DATA.to_vec(),
        Role::ITOperations => IT.to_vec(),
    };
    out.extend(GENERAL);
    out
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn incident(title: &str, threat: &str, severity: &str, status: &str, age_h: i64) -> Incident {
        Incident {
            title: title.to_string(),
            threat_type: threat.to_string(),
            severity: severity.to_string(),
            status: status.to_string(),
            created_at: Utc::now() - Duration::hours(age_h),
        }
    }

    fn incidents() -> Vec<Incident> {
        vec![
            incident("Old phish", "Phishing", "Low", "Resolved", 100),
            incident("Ransom note", "Malware", "Critical", "Open", 1),
            incident("Fake invoice", "Phishing", "Medium", "Open", 2),
            incident("Port scan", "Recon", "Low", "Resolved", 3),
            incident("Worm", "Malware", "Critical", "In Progress", 4),
            incident("Spoofed CEO", "Phishing", "High", "Open", 5),
            incident("Flood", "DDoS", "High", "Resolved", 6),
        ]
    }

    #[test]
    fn incident_rendering_counts_and_recent_rows() {
        let text = DashboardContext::Incidents(incidents()).render();
        assert!(text.contains("Total incidents: 7\n"));
        assert!(text.contains("Open incidents: 3\n"));
        assert!(text.contains("Critical incidents: 2\n"));
        assert!(text.contains("Top threat types: Phishing(3), Malware(2), DDoS(1)\n"));
        assert!(text.contains("- Ransom note: Critical - Open\n"));
        // Only the five newest rows are listed.
        assert!(!text.contains("Old phish"));
        assert!(!text.contains("Flood"));
    }

    #[test]
    fn dataset_summary_handles_missing_scores() {
        let rows = vec![
            Dataset {
                name: "sales".into(),
                source_department: "Finance".into(),
                size_mb: 10.0,
                quality_score: Some(8.0),
                created_at: Utc::now(),
            },
            Dataset {
                name: "logs".into(),
                source_department: "IT".into(),
                size_mb: 2.5,
                quality_score: None,
                created_at: Utc::now(),
            },
        ];
        let ctx = DashboardContext::Datasets(rows);
        assert_eq!(ctx.fallback_summary(), "2 datasets, average quality 8.0/10, 12.5 MB in total.");
        assert!(ctx.render().contains("- logs: quality n/a/10\n"));
    }

    #[test]
    fn empty_contexts_have_plain_fallbacks() {
        assert_eq!(DashboardContext::Tickets(vec![]).fallback_summary(), "No tickets recorded.");
        assert!(DashboardContext::Incidents(vec![]).is_empty());
    }

    #[test]
    fn questions_follow_role() {
        let admin = suggested_questions(Role::Admin);
        let it = suggested_questions(Role::ITOperations);
        assert!(admin.contains(&"Which threat types are most common?"));
        assert!(admin.contains(&"What IT tickets need attention?"));
        assert!(it.contains(&"What IT tickets need attention?"));
        assert!(!it.contains(&"Which threat types are most common?"));
        assert!(it.contains(&"What are the top priorities?"));
    }

    #[test]
    fn context_deserializes_from_tagged_json() {
        let ctx: DashboardContext = serde_json::from_value(serde_json::json!({
            "kind": "tickets",
            "rows": [{
                "title": "VPN down",
                "category": "Network",
                "priority": "Critical",
                "status": "Open",
                "created_at": "2025-01-01T00:00:00Z"
            }]
        }))
        .unwrap();
        assert_eq!(ctx.owner(), Role::ITOperations);
        assert!(ctx.render().contains("Critical tickets: 1\n"));
    }
}
