use chrono::NaiveDate;
use lunchvote_core::db::open_db_in_memory;
use lunchvote_core::{
    DirectoryRepository, DirectoryService, NewRestaurant, RegisterEmployeeRequest, RepoError,
    SqliteDirectoryRepository, VoteDirectory,
};
use rusqlite::Connection;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn restaurant(name: &str) -> NewRestaurant {
    NewRestaurant {
        name: name.to_string(),
        description: format!("{name} kitchen"),
        ..NewRestaurant::default()
    }
}

#[test]
fn restaurants_are_listed_by_name_and_names_are_unique() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    service.create_restaurant(&restaurant("Tacos")).unwrap();
    service.create_restaurant(&restaurant("Bento")).unwrap();
    let names: Vec<String> = service
        .list_restaurants()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Bento", "Tacos"]);

    let err = service.create_restaurant(&restaurant("Tacos")).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn menu_upload_is_limited_to_once_per_restaurant_per_day() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());
    let tacos = service.create_restaurant(&restaurant("Tacos")).unwrap();

    let menu = service
        .upload_menu(tacos.id, Some("menus/tacos-monday.pdf"), day(6))
        .unwrap();
    assert_eq!(menu.points_total, 0);
    assert_eq!(menu.document.as_deref(), Some("menus/tacos-monday.pdf"));

    let err = service.upload_menu(tacos.id, None, day(6)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::MenuAlreadyUploaded { restaurant_id, .. } if restaurant_id == tacos.id
    ));

    service.upload_menu(tacos.id, None, day(7)).unwrap();
    assert_eq!(service.menus_for_day(day(6)).unwrap().len(), 1);
    assert_eq!(service.menus_for_day(day(7)).unwrap().len(), 1);
}

#[test]
fn menu_upload_for_unknown_restaurant_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let err = service.upload_menu(42, None, day(6)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "restaurant",
            id: 42
        }
    ));
}

#[test]
fn employee_registration_reuses_organization_and_role() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDirectoryRepository::try_new(&conn).unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let request = |code: &str| RegisterEmployeeRequest {
        employee_code: code.to_string(),
        display_name: format!("Employee {code}"),
        organization: "Acme".to_string(),
        role: "Engineer".to_string(),
        date_of_joining: Some(day(1)),
    };

    let first = service.register_employee(&request("e-1")).unwrap();
    let second = service.register_employee(&request("e-2")).unwrap();
    assert_eq!(first.organization_id, second.organization_id);
    assert_eq!(first.role_id, second.role_id);
    assert!(repo.employee_exists(first.id).unwrap());
    assert_eq!(repo.get_employee(second.id).unwrap(), Some(second));

    let err = service.register_employee(&request("e-1")).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn lookups_report_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDirectoryRepository::try_new(&conn).unwrap();

    assert!(!repo.menu_exists(999).unwrap());
    assert!(!repo.employee_exists(999).unwrap());
    assert_eq!(repo.get_menu(999).unwrap(), None);
    assert!(repo.menus_for_day(day(6)).unwrap().is_empty());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteDirectoryRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("restaurants")));
}

#[test]
fn blank_names_are_rejected_as_input_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let err = service.create_restaurant(&restaurant("   ")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)), "{err:?}");
    assert_eq!(err.to_string(), "restaurant name cannot be empty");

    let err = service
        .register_employee(&RegisterEmployeeRequest {
            employee_code: "e-1".to_string(),
            display_name: "Sam".to_string(),
            organization: " ".to_string(),
            role: "Engineer".to_string(),
            date_of_joining: None,
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)), "{err:?}");
}
