//! Routing of new reports into responsibility areas.
//!
//! `route` is the pure rule: which active areas contain a point, and which
//! of them the report is persisted against. `RoutingDispatcher` adds the
//! side effects around it: stamping `RoutingInfo` on the report and fanning
//! out notifications for matched areas.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::area::Area;
use crate::geo::{point_in_polygon, GeoPoint, GeometryError};
use crate::notify::Notifier;
use crate::report::{Report, RoutingInfo, MATCHED_BY_GEO_WITHIN};

/// Outcome of routing one report location against an area snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    /// Ids of every active area containing the point, in snapshot order.
    pub matched_area_ids: Vec<String>,

    /// The single area the report is persisted against: highest `priority`
    /// among the matches, ties broken by first-encountered.
    pub primary_area_id: Option<String>,

    pub matched_at: DateTime<Utc>,
}

/// Decide area membership for `point` against a snapshot of areas.
///
/// Inactive areas never match. Geometry errors propagate; with areas
/// validated at index insertion they indicate a caller bypassing the index.
pub fn route(point: GeoPoint, areas: &[Area]) -> Result<RoutingDecision, GeometryError> {
    let mut matched_area_ids = Vec::new();
    let mut primary: Option<&Area> = None;

    for area in areas.iter().filter(|a| a.is_active) {
        if !point_in_polygon(point, &area.polygon)? {
            continue;
        }

        matched_area_ids.push(area.id.clone());
        match primary {
            // Strict comparison keeps the first-encountered area on ties.
            Some(best) if best.priority >= area.priority => {}
            _ => primary = Some(area),
        }
    }

    Ok(RoutingDecision {
        matched_area_ids,
        primary_area_id: primary.map(|a| a.id.clone()),
        matched_at: Utc::now(),
    })
}

/// Applies routing decisions to reports and notifies matched areas.
pub struct RoutingDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl RoutingDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Route `report`, stamp its `RoutingInfo` and notify every matched
    /// area with a non-empty recipient list.
    ///
    /// `RoutingInfo` is write-once: an already-routed report keeps its
    /// original assignment and only the fresh decision is returned.
    /// Notification failures are logged and never affect the decision or
    /// the report — notification is fire-and-forget relative to creation.
    pub fn dispatch(
        &self,
        report: &mut Report,
        areas: &[Area],
    ) -> Result<RoutingDecision, GeometryError> {
        let decision = route(report.location, areas)?;

        if report.routing.is_none() {
            report.routing = Some(RoutingInfo {
                assigned_area_id: decision.primary_area_id.clone(),
                matched_by: decision
                    .primary_area_id
                    .is_some()
                    .then(|| MATCHED_BY_GEO_WITHIN.to_string()),
                matched_at: Some(decision.matched_at),
            });
        } else {
            log::debug!(
                "report '{}' already routed, keeping existing assignment",
                report.id
            );
        }

        for area_id in &decision.matched_area_ids {
            let Some(area) = areas.iter().find(|a| &a.id == area_id) else {
                continue;
            };
            if area.notification_emails.is_empty() {
                continue;
            }
            if let Err(err) = self.notifier.notify(report, area) {
                log::warn!("notification for area '{}' failed: {err}", area.id);
            }
        }

        Ok(decision)
    }
}
