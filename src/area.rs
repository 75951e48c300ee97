//! Responsibility areas and the in-memory area index.
//!
//! Areas are drawn and owned by administrators elsewhere; this core only
//! reads them. The index is a snapshot view rebuilt per routing decision,
//! not a live-streamed one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geo::{GeometryError, Polygon};

/// An administrator-drawn responsibility area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    pub name: String,
    pub polygon: Polygon,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Higher priority wins the primary assignment when areas overlap.
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub notification_emails: HashSet<String>,
}

fn default_true() -> bool {
    true
}

/// In-memory, insertion-ordered collection of areas.
///
/// Insertion validates the polygon so routing can assume well-formed
/// geometry. Insertion order is preserved because it doubles as the
/// tie-break order for primary-area selection.
#[derive(Debug, Default)]
pub struct AreaIndex {
    areas: Vec<Area>,
}

impl AreaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an area, replacing any existing area with the same id in place.
    ///
    /// Rejects malformed polygons early with `GeometryError`.
    pub fn insert(&mut self, area: Area) -> Result<(), GeometryError> {
        area.polygon.validate()?;

        match self.areas.iter_mut().find(|a| a.id == area.id) {
            Some(existing) => *existing = area,
            None => self.areas.push(area),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Area> {
        let idx = self.areas.iter().position(|a| a.id == id)?;
        Some(self.areas.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// All areas, insertion order.
    pub fn all(&self) -> &[Area] {
        &self.areas
    }

    /// Active areas only, insertion order.
    pub fn list_active(&self) -> Vec<&Area> {
        self.areas.iter().filter(|a| a.is_active).collect()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
