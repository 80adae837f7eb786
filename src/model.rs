//! Core data model.
//!
//! A work item wraps a reference to one source row plus per-session progress
//! (visited, status). Identity is the pair (source table, object id); the
//! volatile fields are the only thing this crate persists.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status / Visibility
// ---------------------------------------------------------------------------

/// Progress status of a work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Todo,
    Done,
    Unknown,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Todo => "todo",
            Status::Done => "done",
            Status::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(Status::Todo),
            "done" => Ok(Status::Done),
            "unknown" => Ok(Status::Unknown),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Which statuses a work list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Todo,
    Done,
    All,
}

impl Visibility {
    /// Does an item with `status` pass this filter?
    pub fn admits(self, status: Status) -> bool {
        match self {
            Visibility::Todo => status != Status::Done,
            Visibility::Done => status == Status::Done,
            Visibility::All => true,
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(Visibility::Todo),
            "done" => Ok(Visibility::Done),
            "all" => Ok(Visibility::All),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// How a data source is opened again on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkspaceFactory {
    #[serde(rename = "FileGDB")]
    FileGdb,
    #[serde(rename = "SDE")]
    Sde,
    Shapefile,
    Custom,
}

impl std::str::FromStr for WorkspaceFactory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filegdb" => Ok(WorkspaceFactory::FileGdb),
            "sde" => Ok(WorkspaceFactory::Sde),
            "shapefile" => Ok(WorkspaceFactory::Shapefile),
            "custom" => Ok(WorkspaceFactory::Custom),
            other => Err(format!("unknown workspace factory: {other}")),
        }
    }
}

/// Identity of a data source (workspace). Stable across sessions as long as
/// the data source is not relocated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataSourceIdentity {
    pub connection_string: String,
    pub factory: WorkspaceFactory,
}

impl DataSourceIdentity {
    pub fn new(connection_string: impl Into<String>, factory: WorkspaceFactory) -> Self {
        Self {
            connection_string: connection_string.into(),
            factory,
        }
    }
}

/// A table as recorded inside a workspace entry.
///
/// `id` is the table's registration id in its data source, or -1 for
/// unregistered tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableReference {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Identity of a source table: its data source plus the table itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GdbTableIdentity {
    pub data_source: DataSourceIdentity,
    pub id: i64,
    pub name: String,
}

impl GdbTableIdentity {
    pub fn new(data_source: DataSourceIdentity, id: i64, name: impl Into<String>) -> Self {
        Self {
            data_source,
            id,
            name: name.into(),
        }
    }

    pub fn reference(&self) -> TableReference {
        TableReference {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for GdbTableIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.data_source.connection_string)
    }
}

/// (source table, object id). Two items are "the same" iff their identities
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItemIdentity {
    pub table: GdbTableIdentity,
    pub oid: i64,
}

impl WorkItemIdentity {
    pub fn new(table: GdbTableIdentity, oid: i64) -> Self {
        Self { table, oid }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box, the only geometry summary an item carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Envelope {
    /// Build an envelope from two corners in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x_min: x1.min(x2),
            y_min: y1.min(y2),
            x_max: x1.max(x2),
            y_max: y1.max(y2),
        }
    }

    /// Degenerate envelope of a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Touching boundaries count as intersecting.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.x_min <= other.x_max
            && other.x_min <= self.x_max
            && self.y_min <= other.y_max
            && other.y_min <= self.y_max
    }

    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Distance between the two centres.
    pub fn center_distance(&self, other: &Envelope) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// One unit of work, rebuilt each session from a live row plus looked-up
/// state.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub identity: WorkItemIdentity,
    pub status: Status,
    pub visited: bool,
    /// Recomputed from the row, never persisted.
    pub extent: Option<Envelope>,
    /// Display only.
    pub description: String,
}

impl WorkItem {
    pub fn new(identity: WorkItemIdentity, extent: Option<Envelope>) -> Self {
        let description = format!("{} OID:{}", identity.table.name, identity.oid);
        Self {
            identity,
            status: Status::Todo,
            visited: false,
            extent,
            description,
        }
    }

    pub fn oid(&self) -> i64 {
        self.identity.oid
    }

    pub fn table(&self) -> &GdbTableIdentity {
        &self.identity.table
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for WorkItem {}

// ---------------------------------------------------------------------------
// Persisted State
// ---------------------------------------------------------------------------

/// What the state cache needs from any persisted state shape.
pub trait ItemState {
    fn oid(&self) -> i64;
    fn visited(&self) -> bool;
    fn set_visited(&mut self, visited: bool);
}

/// Persisted volatile state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemState {
    #[serde(rename = "OID")]
    pub oid: i64,
    #[serde(rename = "Visited")]
    pub visited: bool,
    #[serde(rename = "Status")]
    pub status: Status,
}

impl WorkItemState {
    pub fn new(oid: i64, visited: bool, status: Status) -> Self {
        Self {
            oid,
            visited,
            status,
        }
    }
}

impl ItemState for WorkItemState {
    fn oid(&self) -> i64 {
        self.oid
    }

    fn visited(&self) -> bool {
        self.visited
    }

    fn set_visited(&mut self, visited: bool) {
        self.visited = visited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_filters_by_status() {
        assert!(Visibility::Todo.admits(Status::Todo));
        assert!(Visibility::Todo.admits(Status::Unknown));
        assert!(!Visibility::Todo.admits(Status::Done));
        assert!(Visibility::Done.admits(Status::Done));
        assert!(!Visibility::Done.admits(Status::Todo));
        assert!(Visibility::All.admits(Status::Done));
    }

    #[test]
    fn envelope_intersection_includes_touching() {
        let a = Envelope::new(0.0, 0.0, 10.0, 10.0);
        let b = Envelope::new(10.0, 10.0, 20.0, 20.0);
        let c = Envelope::new(10.5, 0.0, 20.0, 5.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn envelope_normalizes_corners_and_unions() {
        let a = Envelope::new(40.0, 40.0, 0.0, 0.0);
        assert_eq!(a.x_min, 0.0);
        assert_eq!(a.y_max, 40.0);

        let u = a.union(&Envelope::new(0.0, 0.0, 80.0, 80.0));
        assert_eq!(u, Envelope::new(0.0, 0.0, 80.0, 80.0));
        assert_eq!(Envelope::point(7.0, 0.0).center_distance(&Envelope::point(10.0, 4.0)), 5.0);
    }

    #[test]
    fn items_with_same_identity_are_equal() {
        let ds = DataSourceIdentity::new("C:/data/issues.gdb", WorkspaceFactory::FileGdb);
        let table = GdbTableIdentity::new(ds, 3, "IssuePolygons");
        let mut a = WorkItem::new(WorkItemIdentity::new(table.clone(), 1), None);
        let b = WorkItem::new(WorkItemIdentity::new(table, 1), None);
        a.visited = true;
        a.status = Status::Done;
        assert_eq!(a, b);
        assert_eq!(a.description, "IssuePolygons OID:1");
    }
}
