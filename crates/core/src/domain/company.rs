use serde::{Deserialize, Serialize};

use crate::domain::schedule::ScheduleWindow;
use crate::geo::{GeoPoint, GeoPolygon};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchId(pub String);

/// A buyer or provider company. `owner_user_id` links marketplace users to the
/// company they act for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub owner_user_id: String,
}

/// A buyer location orders are delivered to. The `address` point is what drop
/// zones are tested against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub company_id: CompanyId,
    pub name: String,
    pub address: GeoPoint,
}

/// A provider delivery polygon with its weekly delivery slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropZone {
    pub id: String,
    pub zone: GeoPolygon,
    pub schedules: Vec<ScheduleWindow>,
}

/// A provider collection location with its weekly availability slots, matched
/// by radius instead of polygon containment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickUpPoint {
    pub id: String,
    pub location: GeoPoint,
    pub schedules: Vec<ScheduleWindow>,
}
