//! Voter identities and their organizational context.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type EmployeeId = i64;
pub type OrganizationId = i64;
pub type RoleId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// A voter. Immutable from the tally engine's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    /// Human-facing code, unique across all organizations.
    pub employee_code: String,
    pub display_name: String,
    pub organization_id: OrganizationId,
    pub role_id: RoleId,
    pub date_of_joining: Option<NaiveDate>,
}

/// Input for registering an employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub employee_code: String,
    pub display_name: String,
    pub organization_id: OrganizationId,
    pub role_id: RoleId,
    pub date_of_joining: Option<NaiveDate>,
}
