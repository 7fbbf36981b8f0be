//! Request-level API for the lunch voting service.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to the HTTP transport.
//! - Map core errors to status codes and user-facing messages.
//!
//! # Invariants
//! - Exported functions never panic; every failure becomes an envelope.
//! - Each call opens its own connection to the configured database.
//! - "Today" is the server's local calendar day.

use crate::payload::vote_request;
use chrono::{Local, NaiveDate};
use log::{error, warn};
use lunchvote_core::db::open_db_with_timeout;
use lunchvote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Ballot, CoreConfig, DirectoryService, Employee, Menu, NewRestaurant, RegisterEmployeeRequest,
    RepoError, Restaurant, RestaurantId, SqliteDirectoryRepository, SqliteTallyLedger,
    SubmissionMode, VoteError, VoteService, WinnerOutcome, WinnerService,
};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_UNAVAILABLE: u16 = 503;

const MSG_UNAVAILABLE: &str = "Service temporarily unavailable, please retry.";

static API_CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Response envelope shared by every API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    /// HTTP-style status code.
    pub status: u16,
    pub success: bool,
    /// Human-readable message for the client.
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(status: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Serializes the envelope for the transport layer.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            error!("event=response_encode module=api status=error error={err}");
            format!(
                r#"{{"status":{STATUS_UNAVAILABLE},"success":false,"message":"{MSG_UNAVAILABLE}","data":null}}"#
            )
        })
    }
}

/// Payload of an accepted vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteResponseData {
    /// `single` or `batch`.
    pub mode: &'static str,
    pub ballots: Vec<Ballot>,
}

/// Minimal health-check API.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message on failure.
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the database path used by every later call.
///
/// Must run before the first data call; afterwards only the already active
/// path is accepted. Returns an empty string on success.
pub fn configure_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path must not be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = API_CONFIG.get_or_init(|| CoreConfig {
        db_path: requested.clone(),
        ..CoreConfig::from_env()
    });
    if active.db_path == requested {
        String::new()
    } else {
        format!(
            "database path already configured as `{}`",
            active.db_path.display()
        )
    }
}

/// Records a vote for today.
///
/// `build_version` is the client build signal: `old` submits one menu,
/// `new` submits a ranked batch of three.
pub fn vote_menu(build_version: Option<String>, body_json: String) -> ApiResponse<VoteResponseData> {
    with_connection(|conn| vote_menu_in(conn, today(), build_version.as_deref(), &body_json))
}

/// Returns today's winning menus; every tied menu is included.
pub fn winning_menus_today() -> ApiResponse<Vec<Menu>> {
    with_connection(|conn| winning_menus_in(conn, today()))
}

pub fn create_restaurant(
    name: String,
    description: String,
    phone_number: Option<String>,
    address: Option<String>,
) -> ApiResponse<Restaurant> {
    let restaurant = NewRestaurant {
        name,
        description,
        phone_number,
        address,
    };
    with_connection(|conn| create_restaurant_in(conn, &restaurant))
}

pub fn list_restaurants() -> ApiResponse<Vec<Restaurant>> {
    with_connection(list_restaurants_in)
}

/// Publishes today's menu for `restaurant_id`.
pub fn upload_menu(restaurant_id: RestaurantId, document: Option<String>) -> ApiResponse<Menu> {
    with_connection(|conn| upload_menu_in(conn, today(), restaurant_id, document.as_deref()))
}

pub fn current_day_menus() -> ApiResponse<Vec<Menu>> {
    with_connection(|conn| current_day_menus_in(conn, today()))
}

pub fn register_employee(
    employee_code: String,
    display_name: String,
    organization: String,
    role: String,
) -> ApiResponse<Employee> {
    let request = RegisterEmployeeRequest {
        employee_code,
        display_name,
        organization,
        role,
        date_of_joining: Some(today()),
    };
    with_connection(|conn| register_employee_in(conn, &request))
}

pub(crate) fn vote_menu_in(
    conn: &Connection,
    day: NaiveDate,
    build_version: Option<&str>,
    body_json: &str,
) -> ApiResponse<VoteResponseData> {
    // The build signal is checked before the body so unsupported clients
    // always get the version error.
    if SubmissionMode::from_build_version(build_version).is_none() {
        return vote_failure(&VoteError::InvalidRequestVersion {
            build_version: build_version.map(str::to_string),
        });
    }
    let body = match serde_json::from_str::<serde_json::Value>(body_json) {
        Ok(body) => body,
        Err(err) => {
            warn!("event=vote_submit module=api status=rejected error_code=malformed_payload error={err}");
            return ApiResponse::failure(STATUS_BAD_REQUEST, "Malformed payload");
        }
    };
    let request = vote_request(build_version, &body);

    let service = match (
        SqliteDirectoryRepository::try_new(conn),
        SqliteTallyLedger::try_new(conn),
    ) {
        (Ok(directory), Ok(ledger)) => VoteService::new(directory, ledger),
        (Err(err), _) => return vote_failure(&VoteError::from(err)),
        (_, Err(err)) => return vote_failure(&VoteError::from(err)),
    };

    match service.submit_vote(&request, day) {
        Ok(receipt) => {
            let message = match receipt.mode {
                SubmissionMode::Single => "Vote recorded successfully",
                SubmissionMode::Batch => "Votes recorded successfully",
            };
            ApiResponse::success(
                STATUS_OK,
                message,
                VoteResponseData {
                    mode: receipt.mode.label(),
                    ballots: receipt.ballots,
                },
            )
        }
        Err(err) => vote_failure(&err),
    }
}

pub(crate) fn winning_menus_in(conn: &Connection, day: NaiveDate) -> ApiResponse<Vec<Menu>> {
    let outcome = SqliteDirectoryRepository::try_new(conn)
        .and_then(|directory| WinnerService::new(directory).winning_menus(day));
    match outcome {
        Ok(WinnerOutcome::Winners(menus)) => {
            ApiResponse::success(STATUS_OK, "Winning menu found.", menus)
        }
        Ok(WinnerOutcome::NoWinner) => ApiResponse::failure(
            STATUS_NOT_FOUND,
            "No winning menu found for the current day.",
        ),
        Err(err) => directory_failure(&err),
    }
}

pub(crate) fn create_restaurant_in(
    conn: &Connection,
    restaurant: &NewRestaurant,
) -> ApiResponse<Restaurant> {
    match with_directory(conn, |service| service.create_restaurant(restaurant)) {
        Ok(created) => ApiResponse::success(STATUS_CREATED, "Restaurant created successfully", created),
        Err(err) => directory_failure(&err),
    }
}

pub(crate) fn list_restaurants_in(conn: &Connection) -> ApiResponse<Vec<Restaurant>> {
    match with_directory(conn, |service| service.list_restaurants()) {
        Ok(restaurants) => ApiResponse::success(STATUS_OK, "Restaurants listed.", restaurants),
        Err(err) => directory_failure(&err),
    }
}

pub(crate) fn upload_menu_in(
    conn: &Connection,
    day: NaiveDate,
    restaurant_id: RestaurantId,
    document: Option<&str>,
) -> ApiResponse<Menu> {
    match with_directory(conn, |service| service.upload_menu(restaurant_id, document, day)) {
        Ok(menu) => ApiResponse::success(STATUS_CREATED, "Menu uploaded successfully", menu),
        Err(err) => directory_failure(&err),
    }
}

pub(crate) fn current_day_menus_in(conn: &Connection, day: NaiveDate) -> ApiResponse<Vec<Menu>> {
    match with_directory(conn, |service| service.menus_for_day(day)) {
        Ok(menus) => ApiResponse::success(STATUS_OK, "Menus for the current day.", menus),
        Err(err) => directory_failure(&err),
    }
}

pub(crate) fn register_employee_in(
    conn: &Connection,
    request: &RegisterEmployeeRequest,
) -> ApiResponse<Employee> {
    let required = [
        ("employee_code", &request.employee_code),
        ("display_name", &request.display_name),
        ("organization", &request.organization),
        ("role", &request.role),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return ApiResponse::failure(STATUS_BAD_REQUEST, format!("Field `{field}` is required"));
    }
    match with_directory(conn, |service| service.register_employee(request)) {
        Ok(employee) => ApiResponse::success(STATUS_CREATED, "Employee registered successfully", employee),
        Err(err) => directory_failure(&err),
    }
}

fn vote_failure<T: Serialize>(err: &VoteError) -> ApiResponse<T> {
    let (status, message) = match err {
        VoteError::InvalidRequestVersion { .. } => (STATUS_BAD_REQUEST, "Invalid API version"),
        VoteError::InvalidMenu(_) => (STATUS_BAD_REQUEST, "Invalid menu ID"),
        VoteError::InvalidEmployee(_) => (STATUS_BAD_REQUEST, "Provide a valid employee ID"),
        VoteError::InvalidVoteData(_) => (STATUS_BAD_REQUEST, "Invalid vote data"),
        VoteError::DuplicateVote { .. } | VoteError::StorageConflict { .. } => {
            (STATUS_BAD_REQUEST, "You have already voted for this menu today")
        }
        VoteError::Unavailable(_) => (
            STATUS_UNAVAILABLE,
            "Voting is temporarily unavailable, please retry.",
        ),
    };
    ApiResponse::failure(status, message)
}

fn directory_failure<T: Serialize>(err: &RepoError) -> ApiResponse<T> {
    match err {
        RepoError::NotFound { entity, id } => {
            ApiResponse::failure(STATUS_NOT_FOUND, format!("{entity} {id} not found"))
        }
        RepoError::Validation(message) => ApiResponse::failure(STATUS_BAD_REQUEST, message.clone()),
        RepoError::Conflict(message) => ApiResponse::failure(STATUS_CONFLICT, message.clone()),
        RepoError::MenuAlreadyUploaded { .. } => ApiResponse::failure(
            STATUS_CONFLICT,
            "Menu for this restaurant has already been uploaded for today.",
        ),
        RepoError::Db(_) | RepoError::InvalidData(_) | RepoError::MissingRequiredTable(_) => {
            error!("event=directory_call module=api status=error error={err}");
            ApiResponse::failure(STATUS_UNAVAILABLE, MSG_UNAVAILABLE)
        }
    }
}

fn with_directory<T>(
    conn: &Connection,
    f: impl FnOnce(&DirectoryService<SqliteDirectoryRepository<'_>>) -> lunchvote_core::RepoResult<T>,
) -> lunchvote_core::RepoResult<T> {
    let repo = SqliteDirectoryRepository::try_new(conn)?;
    f(&DirectoryService::new(repo))
}

fn with_connection<T: Serialize>(f: impl FnOnce(&Connection) -> ApiResponse<T>) -> ApiResponse<T> {
    let config = resolve_config();
    match open_db_with_timeout(&config.db_path, config.busy_timeout) {
        Ok(conn) => f(&conn),
        Err(err) => {
            error!(
                "event=db_open module=api status=error retryable={} error={err}",
                err.is_unavailable()
            );
            ApiResponse::failure(STATUS_UNAVAILABLE, MSG_UNAVAILABLE)
        }
    }
}

fn resolve_config() -> &'static CoreConfig {
    API_CONFIG.get_or_init(CoreConfig::from_env)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
