//! Directory use-case service.
//!
//! # Responsibility
//! - Register restaurants and employees, and publish daily menus.
//! - Keep request-layer callers away from repository details.
//!
//! # Invariants
//! - A restaurant publishes at most one menu per day.
//! - Organizations and roles are created on first reference by name.

use crate::model::employee::{Employee, NewEmployee};
use crate::model::menu::{Menu, NewRestaurant, Restaurant, RestaurantId};
use crate::repo::directory_repo::{DirectoryRepository, RepoResult};
use chrono::NaiveDate;
use log::info;

/// Request model for registering an employee by organization/role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEmployeeRequest {
    pub employee_code: String,
    pub display_name: String,
    pub organization: String,
    pub role: String,
    pub date_of_joining: Option<NaiveDate>,
}

pub struct DirectoryService<R: DirectoryRepository> {
    repo: R,
}

impl<R: DirectoryRepository> DirectoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_restaurant(&self, restaurant: &NewRestaurant) -> RepoResult<Restaurant> {
        let created = self.repo.create_restaurant(restaurant)?;
        info!(
            "event=restaurant_create module=directory status=ok restaurant_id={}",
            created.id
        );
        Ok(created)
    }

    /// Lists restaurants ordered by name.
    pub fn list_restaurants(&self) -> RepoResult<Vec<Restaurant>> {
        self.repo.list_restaurants()
    }

    /// Publishes `restaurant_id`'s menu for `day`.
    ///
    /// Fails with `MenuAlreadyUploaded` when the restaurant already has one.
    pub fn upload_menu(
        &self,
        restaurant_id: RestaurantId,
        document: Option<&str>,
        day: NaiveDate,
    ) -> RepoResult<Menu> {
        let document = document.map(str::trim).filter(|value| !value.is_empty());
        let menu = self.repo.create_menu(restaurant_id, document, day)?;
        info!(
            "event=menu_upload module=directory status=ok restaurant_id={} menu_id={} day={}",
            restaurant_id, menu.id, day
        );
        Ok(menu)
    }

    /// Menus published on `day`, ordered by id.
    pub fn menus_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Menu>> {
        self.repo.menus_for_day(day)
    }

    pub fn register_employee(&self, request: &RegisterEmployeeRequest) -> RepoResult<Employee> {
        let organization = self.repo.ensure_organization(&request.organization)?;
        let role = self.repo.ensure_role(&request.role)?;
        let employee = self.repo.create_employee(&NewEmployee {
            employee_code: request.employee_code.clone(),
            display_name: request.display_name.trim().to_string(),
            organization_id: organization.id,
            role_id: role.id,
            date_of_joining: request.date_of_joining,
        })?;
        info!(
            "event=employee_register module=directory status=ok employee_id={} organization_id={}",
            employee.id, organization.id
        );
        Ok(employee)
    }
}
