//! Restaurant and menu records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type RestaurantId = i64;
pub type MenuId = i64;

/// A restaurant that can publish one menu per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub description: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Input for registering a restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRestaurant {
    pub name: String,
    pub description: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// A restaurant's offering for one calendar day.
///
/// `points_total` is the running tally for this menu and is only ever
/// changed by the ballot ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub restaurant_id: RestaurantId,
    /// Opaque reference to the uploaded menu document.
    pub document: Option<String>,
    pub points_total: u32,
    pub created_on: NaiveDate,
}
