use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Display tone used by renderers to color status chips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
    Info,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Warning => "warning",
            Tone::Error => "error",
            Tone::Info => "info",
            Tone::Neutral => "neutral",
        }
    }
}

/// Rows shown by list views.
pub trait Entity {
    fn id(&self) -> &str;

    /// One-line description for tables and summaries.
    fn summary(&self) -> String;

    fn tone(&self) -> Tone {
        Tone::Neutral
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Inactive,
    Blacklisted,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
            CompanyStatus::Blacklisted => "blacklisted",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            CompanyStatus::Active => Tone::Success,
            CompanyStatus::Inactive => Tone::Neutral,
            CompanyStatus::Blacklisted => Tone::Error,
        }
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompanyStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(CompanyStatus::Active),
            "inactive" => Ok(CompanyStatus::Inactive),
            "blacklisted" => Ok(CompanyStatus::Blacklisted),
            other => Err(anyhow!(
                "Unknown company status '{}': expected active|inactive|blacklisted",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Placed,
    Unplaced,
    #[serde(alias = "opted-out", alias = "optedOut")]
    OptedOut,
}

impl PlacementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementStatus::Placed => "placed",
            PlacementStatus::Unplaced => "unplaced",
            PlacementStatus::OptedOut => "opted_out",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            PlacementStatus::Placed => Tone::Success,
            PlacementStatus::Unplaced => Tone::Warning,
            PlacementStatus::OptedOut => Tone::Neutral,
        }
    }
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlacementStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "placed" => Ok(PlacementStatus::Placed),
            "unplaced" => Ok(PlacementStatus::Unplaced),
            "opted_out" | "opted-out" | "optedout" => Ok(PlacementStatus::OptedOut),
            other => Err(anyhow!(
                "Unknown placement status '{}': expected placed|unplaced|opted_out",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriveStatus {
    Upcoming,
    Ongoing,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl DriveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveStatus::Upcoming => "upcoming",
            DriveStatus::Ongoing => "ongoing",
            DriveStatus::Completed => "completed",
            DriveStatus::Cancelled => "cancelled",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            DriveStatus::Upcoming => Tone::Info,
            DriveStatus::Ongoing => Tone::Warning,
            DriveStatus::Completed => Tone::Success,
            DriveStatus::Cancelled => Tone::Error,
        }
    }
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DriveStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(DriveStatus::Upcoming),
            "ongoing" => Ok(DriveStatus::Ongoing),
            "completed" => Ok(DriveStatus::Completed),
            "cancelled" | "canceled" => Ok(DriveStatus::Cancelled),
            other => Err(anyhow!(
                "Unknown drive status '{}': expected upcoming|ongoing|completed|cancelled",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            AuditAction::Create => Tone::Success,
            AuditAction::Update => Tone::Info,
            AuditAction::Delete => Tone::Error,
            AuditAction::Login | AuditAction::Logout => Tone::Neutral,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ValueEnum for AuditAction {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [AuditAction; 5] = [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::Login,
            AuditAction::Logout,
        ];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(alias = "_id", deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    pub status: CompanyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Company {
    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        match self.industry.as_deref() {
            Some(industry) => format!("{} ({industry})", self.name),
            None => self.name.clone(),
        }
    }

    fn tone(&self) -> Tone {
        self.status.tone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id", deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub batch: Option<u16>,
    #[serde(default)]
    pub cgpa: Option<f32>,
    pub status: PlacementStatus,
}

impl Entity for Student {
    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        let mut line = format!("{} <{}>", self.name, self.email);
        if let Some(department) = &self.department {
            line.push_str(&format!(" {department}"));
        }
        if let Some(batch) = self.batch {
            line.push_str(&format!(" '{:02}", batch % 100));
        }
        line
    }

    fn tone(&self) -> Tone {
        self.status.tone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    #[serde(alias = "_id", deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub package_lpa: Option<f64>,
    pub status: DriveStatus,
}

impl Entity for Drive {
    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        let mut line = self.title.clone();
        if let Some(company) = &self.company_name {
            line.push_str(&format!(" @ {company}"));
        }
        if let Some(date) = self.drive_date {
            line.push_str(&format!(" on {}", date.format("%Y-%m-%d")));
        }
        line
    }

    fn tone(&self) -> Tone {
        self.status.tone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(alias = "_id", deserialize_with = "de_id")]
    pub id: String,
    pub action: AuditAction,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default, alias = "user")]
    pub actor: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Entity for AuditLogEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn summary(&self) -> String {
        let actor = self.actor.as_deref().unwrap_or("system");
        let target = match (&self.entity_type, &self.entity_id) {
            (Some(kind), Some(id)) => format!(" {kind}/{id}"),
            (Some(kind), None) => format!(" {kind}"),
            _ => String::new(),
        };
        format!(
            "{} {} {}{}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            actor,
            self.action,
            target
        )
    }

    fn tone(&self) -> Tone {
        self.action.tone()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_students: u64,
    pub placed_students: u64,
    pub total_companies: u64,
    pub active_drives: u64,
    pub average_package_lpa: Option<f64>,
    pub highest_package_lpa: Option<f64>,
}

impl DashboardStats {
    /// Placed students as a percentage of all students.
    pub fn placement_rate(&self) -> Option<f64> {
        if self.total_students == 0 {
            return None;
        }
        Some(self.placed_students as f64 * 100.0 / self.total_students as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadCount {
    #[serde(alias = "unread", alias = "unreadCount")]
    pub count: u64,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> ListPage<T> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'de, T> Deserialize<'de> for ListPage<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape<T> {
            Bare(Vec<T>),
            Paged {
                #[serde(alias = "items", alias = "data")]
                rows: Vec<T>,
                #[serde(default, alias = "totalCount", alias = "count")]
                total: Option<u64>,
            },
        }

        Ok(match Shape::<T>::deserialize(deserializer)? {
            Shape::Bare(rows) => ListPage {
                total: rows.len() as u64,
                rows,
            },
            Shape::Paged { rows, total } => ListPage {
                total: total.unwrap_or(rows.len() as u64),
                rows,
            },
        })
    }
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn list_page_accepts_bare_and_paged_shapes() {
        let bare: ListPage<Company> = serde_json::from_value(json!([
            { "_id": "c1", "name": "Acme", "status": "active" }
        ]))
        .unwrap();
        assert_eq!(bare.total, 1);
        assert_eq!(bare.rows[0].id, "c1");

        let paged: ListPage<Company> = serde_json::from_value(json!({
            "items": [{ "id": 7, "name": "Globex", "status": "inactive" }],
            "totalCount": 42
        }))
        .unwrap();
        assert_eq!(paged.total, 42);
        assert_eq!(paged.rows[0].id, "7");
    }

    #[test]
    fn status_tones_follow_severity() {
        assert_eq!(DriveStatus::Cancelled.tone(), Tone::Error);
        assert_eq!(DriveStatus::Upcoming.tone(), Tone::Info);
        assert_eq!(CompanyStatus::Blacklisted.tone(), Tone::Error);
        assert_eq!(PlacementStatus::Placed.tone(), Tone::Success);
        assert_eq!(AuditAction::Delete.tone(), Tone::Error);
    }

    #[test]
    fn parses_status_aliases() {
        assert_eq!(
            "Canceled".parse::<DriveStatus>().unwrap(),
            DriveStatus::Cancelled
        );
        assert_eq!(
            "opted-out".parse::<PlacementStatus>().unwrap(),
            PlacementStatus::OptedOut
        );
        assert!("archived".parse::<CompanyStatus>().is_err());
    }

    #[test]
    fn placement_rate_handles_empty_cohort() {
        let stats = DashboardStats::default();
        assert_eq!(stats.placement_rate(), None);

        let stats = DashboardStats {
            total_students: 200,
            placed_students: 150,
            ..DashboardStats::default()
        };
        assert_eq!(stats.placement_rate(), Some(75.0));
    }

    #[test]
    fn audit_summary_names_actor_and_target() {
        let entry: AuditLogEntry = serde_json::from_value(json!({
            "id": "a1",
            "action": "delete",
            "entityType": "company",
            "entityId": "c9",
            "user": "admin",
            "timestamp": "2026-03-01T10:30:00Z"
        }))
        .unwrap();
        assert_eq!(entry.summary(), "2026-03-01 10:30 admin delete company/c9");
    }
}
