//! Directory contracts and SQLite implementation.
//!
//! # Responsibility
//! - Answer the lookups the tally engine depends on: menu existence,
//!   employee existence and "menus created on day D".
//! - Provide plain create/read persistence for restaurants, menus,
//!   organizations, roles and employees.
//!
//! # Invariants
//! - One menu per restaurant per day, enforced by a storage constraint.
//! - Directory writes never touch `menus.points_total` or `ballots`.

use crate::db::{is_foreign_key_violation, is_unique_violation, DbError};
use crate::model::employee::{
    Employee, EmployeeId, NewEmployee, Organization, OrganizationId, Role, RoleId,
};
use crate::model::menu::{Menu, MenuId, NewRestaurant, Restaurant, RestaurantId};
use crate::repo::table_exists;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MENU_SELECT_SQL: &str = "SELECT
    id,
    restaurant_id,
    document,
    points_total,
    created_on
FROM menus";

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    id,
    employee_code,
    display_name,
    organization_id,
    role_id,
    date_of_joining
FROM employees";

const REQUIRED_TABLES: [&str; 5] = ["restaurants", "menus", "organizations", "roles", "employees"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for directory persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    /// A unique attribute (name, code) is already taken.
    Conflict(String),
    MenuAlreadyUploaded {
        restaurant_id: RestaurantId,
        day: NaiveDate,
    },
    /// Caller input rejected before reaching storage.
    Validation(String),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::MenuAlreadyUploaded { restaurant_id, day } => write!(
                f,
                "menu for restaurant {restaurant_id} already uploaded on {day}"
            ),
            Self::Validation(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted directory data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-only lookups the voting core needs from the directory.
pub trait VoteDirectory {
    fn menu_exists(&self, id: MenuId) -> RepoResult<bool>;
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool>;
    /// Menus created on `day`, ordered by id.
    fn menus_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Menu>>;
}

/// Full directory contract: lookups plus registration.
pub trait DirectoryRepository: VoteDirectory {
    fn create_restaurant(&self, restaurant: &NewRestaurant) -> RepoResult<Restaurant>;
    fn get_restaurant(&self, id: RestaurantId) -> RepoResult<Option<Restaurant>>;
    /// Lists restaurants ordered by name.
    fn list_restaurants(&self) -> RepoResult<Vec<Restaurant>>;
    fn create_menu(
        &self,
        restaurant_id: RestaurantId,
        document: Option<&str>,
        day: NaiveDate,
    ) -> RepoResult<Menu>;
    fn get_menu(&self, id: MenuId) -> RepoResult<Option<Menu>>;
    /// Returns the organization with `name`, creating it when missing.
    fn ensure_organization(&self, name: &str) -> RepoResult<Organization>;
    /// Returns the role with `name`, creating it when missing.
    fn ensure_role(&self, name: &str) -> RepoResult<Role>;
    fn create_employee(&self, employee: &NewEmployee) -> RepoResult<Employee>;
    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
}

/// SQLite-backed directory repository.
pub struct SqliteDirectoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl VoteDirectory for SqliteDirectoryRepository<'_> {
    fn menu_exists(&self, id: MenuId) -> RepoResult<bool> {
        exists(self.conn, "SELECT EXISTS(SELECT 1 FROM menus WHERE id = ?1);", id)
    }

    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        exists(
            self.conn,
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1);",
            id,
        )
    }

    fn menus_for_day(&self, day: NaiveDate) -> RepoResult<Vec<Menu>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MENU_SELECT_SQL} WHERE created_on = ?1 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([day])?;
        let mut menus = Vec::new();
        while let Some(row) = rows.next()? {
            menus.push(parse_menu_row(row)?);
        }
        Ok(menus)
    }
}

impl DirectoryRepository for SqliteDirectoryRepository<'_> {
    fn create_restaurant(&self, restaurant: &NewRestaurant) -> RepoResult<Restaurant> {
        let name = restaurant.name.trim();
        if name.is_empty() {
            return Err(RepoError::Validation(
                "restaurant name cannot be empty".to_string(),
            ));
        }

        let inserted = self.conn.execute(
            "INSERT INTO restaurants (name, description, phone_number, address)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                name,
                restaurant.description.as_str(),
                restaurant.phone_number.as_deref(),
                restaurant.address.as_deref(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::Conflict(format!(
                    "restaurant `{name}` already exists"
                )));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Restaurant {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: restaurant.description.clone(),
            phone_number: restaurant.phone_number.clone(),
            address: restaurant.address.clone(),
        })
    }

    fn get_restaurant(&self, id: RestaurantId) -> RepoResult<Option<Restaurant>> {
        let restaurant = self
            .conn
            .query_row(
                "SELECT id, name, description, phone_number, address
                 FROM restaurants
                 WHERE id = ?1;",
                [id],
                parse_restaurant_row,
            )
            .optional()?;
        Ok(restaurant)
    }

    fn list_restaurants(&self) -> RepoResult<Vec<Restaurant>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, phone_number, address
             FROM restaurants
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let restaurants = stmt
            .query_map([], parse_restaurant_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(restaurants)
    }

    fn create_menu(
        &self,
        restaurant_id: RestaurantId,
        document: Option<&str>,
        day: NaiveDate,
    ) -> RepoResult<Menu> {
        if self.get_restaurant(restaurant_id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "restaurant",
                id: restaurant_id,
            });
        }

        let inserted = self.conn.execute(
            "INSERT INTO menus (restaurant_id, document, created_on) VALUES (?1, ?2, ?3);",
            params![restaurant_id, document, day],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::MenuAlreadyUploaded { restaurant_id, day });
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Menu {
            id: self.conn.last_insert_rowid(),
            restaurant_id,
            document: document.map(str::to_string),
            points_total: 0,
            created_on: day,
        })
    }

    fn get_menu(&self, id: MenuId) -> RepoResult<Option<Menu>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MENU_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_menu_row(row)?));
        }
        Ok(None)
    }

    fn ensure_organization(&self, name: &str) -> RepoResult<Organization> {
        let (id, name) = ensure_named(self.conn, "organizations", name)?;
        Ok(Organization { id, name })
    }

    fn ensure_role(&self, name: &str) -> RepoResult<Role> {
        let (id, name) = ensure_named(self.conn, "roles", name)?;
        Ok(Role { id, name })
    }

    fn create_employee(&self, employee: &NewEmployee) -> RepoResult<Employee> {
        let code = employee.employee_code.trim();
        if code.is_empty() {
            return Err(RepoError::Validation(
                "employee code cannot be empty".to_string(),
            ));
        }

        let inserted = self.conn.execute(
            "INSERT INTO employees (
                employee_code,
                display_name,
                organization_id,
                role_id,
                date_of_joining
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                code,
                employee.display_name.as_str(),
                employee.organization_id,
                employee.role_id,
                employee.date_of_joining,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::Conflict(format!(
                    "employee code `{code}` already registered"
                )));
            }
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(missing_employee_parent(
                    self.conn,
                    employee.organization_id,
                    employee.role_id,
                )?);
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Employee {
            id: self.conn.last_insert_rowid(),
            employee_code: code.to_string(),
            display_name: employee.display_name.clone(),
            organization_id: employee.organization_id,
            role_id: employee.role_id,
            date_of_joining: employee.date_of_joining,
        })
    }

    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        let employee = self
            .conn
            .query_row(
                &format!("{EMPLOYEE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| {
                    Ok(Employee {
                        id: row.get("id")?,
                        employee_code: row.get("employee_code")?,
                        display_name: row.get("display_name")?,
                        organization_id: row.get("organization_id")?,
                        role_id: row.get("role_id")?,
                        date_of_joining: row.get("date_of_joining")?,
                    })
                },
            )
            .optional()?;
        Ok(employee)
    }
}

fn exists(conn: &Connection, sql: &str, id: i64) -> RepoResult<bool> {
    let found: i64 = conn.query_row(sql, [id], |row| row.get(0))?;
    Ok(found == 1)
}

fn ensure_named(conn: &Connection, table: &'static str, name: &str) -> RepoResult<(i64, String)> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepoError::Validation(format!(
            "{table} name cannot be empty"
        )));
    }

    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (name) VALUES (?1);"),
        [trimmed],
    )?;
    let id: i64 = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1;"),
        [trimmed],
        |row| row.get(0),
    )?;
    Ok((id, trimmed.to_string()))
}

fn missing_employee_parent(
    conn: &Connection,
    organization_id: OrganizationId,
    role_id: RoleId,
) -> RepoResult<RepoError> {
    if !exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM organizations WHERE id = ?1);",
        organization_id,
    )? {
        return Ok(RepoError::NotFound {
            entity: "organization",
            id: organization_id,
        });
    }
    Ok(RepoError::NotFound {
        entity: "role",
        id: role_id,
    })
}

fn parse_restaurant_row(row: &Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        phone_number: row.get("phone_number")?,
        address: row.get("address")?,
    })
}

pub(crate) fn parse_menu_row(row: &Row<'_>) -> RepoResult<Menu> {
    let id: MenuId = row.get("id")?;
    let raw_points: i64 = row.get("points_total")?;
    let points_total = u32::try_from(raw_points).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid points_total `{raw_points}` in menus.points_total for menu {id}"
        ))
    })?;

    Ok(Menu {
        id,
        restaurant_id: row.get("restaurant_id")?,
        document: row.get("document")?,
        points_total,
        created_on: row.get("created_on")?,
    })
}
