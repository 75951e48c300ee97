//! Report data model, as consumed by routing and search.
//!
//! Reports are created and persisted by the host application; this core
//! reads their location and text content, and writes `RoutingInfo` exactly
//! once at creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Marker for routing assignments made by polygon containment.
pub const MATCHED_BY_GEO_WITHIN: &str = "geoWithin";

/// Text fields a report carries, either user-entered or drafted by the
/// vision collaborator. All fields are optional in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggested_fix: String,
}

/// Routing metadata stamped by the dispatcher at report creation.
/// Never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingInfo {
    pub assigned_area_id: Option<String>,
    pub matched_by: Option<String>,
    pub matched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub location: GeoPoint,

    #[serde(default)]
    pub content: ReportContent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingInfo>,
}

impl Report {
    /// Canonical text used for embedding this report.
    ///
    /// Combines title, category (underscores spelled out), severity,
    /// description and suggested fix into one sentence-ish string. The
    /// embedding cache keys staleness on this exact string, so the format
    /// must stay stable.
    pub fn searchable_text(&self) -> String {
        let c = &self.content;
        let category = c.category.replace('_', " ");
        format!(
            "{}. {}. {} severity. {} {}",
            c.title, category, c.severity, c.description, c.suggested_fix
        )
        .trim()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(content: ReportContent) -> Report {
        Report {
            id: "r1".to_string(),
            location: GeoPoint::default(),
            content,
            routing: None,
        }
    }

    #[test]
    fn test_searchable_text_format() {
        let report = report_with(ReportContent {
            title: "Broken curb ramp".to_string(),
            category: "missing_ramp".to_string(),
            severity: "high".to_string(),
            description: "Ramp crumbled at the corner.".to_string(),
            suggested_fix: "Repour the ramp.".to_string(),
        });

        assert_eq!(
            report.searchable_text(),
            "Broken curb ramp. missing ramp. high severity. Ramp crumbled at the corner. Repour the ramp."
        );
    }

    #[test]
    fn test_searchable_text_trims_empty_tail() {
        let report = report_with(ReportContent {
            title: "Pothole".to_string(),
            ..Default::default()
        });

        // Empty fields leave their separators (and a doubled space) in the
        // middle but the ends are trimmed; this mirrors how the host app
        // always built the string, so cached texts stay comparable.
        assert_eq!(report.searchable_text(), "Pothole. .  severity.");
    }

    #[test]
    fn test_searchable_text_is_deterministic() {
        let report = report_with(ReportContent {
            title: "Pothole".to_string(),
            category: "uneven_surface".to_string(),
            ..Default::default()
        });
        assert_eq!(report.searchable_text(), report.searchable_text());
    }

    #[test]
    fn test_routing_info_round_trip() {
        let info = RoutingInfo {
            assigned_area_id: Some("A".to_string()),
            matched_by: Some(MATCHED_BY_GEO_WITHIN.to_string()),
            matched_at: Some(Utc::now()),
        };

        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("assignedAreaId"));
        assert!(json.contains("geoWithin"));

        let back: RoutingInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
