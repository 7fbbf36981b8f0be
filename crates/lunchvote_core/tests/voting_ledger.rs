use chrono::NaiveDate;
use lunchvote_core::db::open_db_in_memory;
use lunchvote_core::{
    AcceptedVote, BatchEntry, DirectoryService, EmployeeId, LedgerError, MenuId, NewRestaurant,
    Points, PointsInput, RegisterEmployeeRequest, SqliteDirectoryRepository, SqliteTallyLedger,
    SubmissionMode, TallyLedger, VoteError, VoteRequest, VoteService, WinnerOutcome,
    WinnerService,
};
use rusqlite::{params, Connection};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

struct Fixture {
    menus: Vec<MenuId>,
    employee: EmployeeId,
}

fn seed(conn: &Connection, menu_count: usize, day: NaiveDate) -> Fixture {
    let directory = DirectoryService::new(SqliteDirectoryRepository::try_new(conn).unwrap());
    let mut menus = Vec::new();
    for index in 0..menu_count {
        let restaurant = directory
            .create_restaurant(&NewRestaurant {
                name: format!("Restaurant {index}"),
                ..NewRestaurant::default()
            })
            .unwrap();
        menus.push(directory.upload_menu(restaurant.id, None, day).unwrap().id);
    }
    let employee = directory
        .register_employee(&RegisterEmployeeRequest {
            employee_code: "tester".to_string(),
            display_name: "Tester".to_string(),
            organization: "Test org".to_string(),
            role: "Test role".to_string(),
            date_of_joining: None,
        })
        .unwrap();
    Fixture {
        menus,
        employee: employee.id,
    }
}

fn service(conn: &Connection) -> VoteService<SqliteDirectoryRepository<'_>, SqliteTallyLedger<'_>> {
    VoteService::new(
        SqliteDirectoryRepository::try_new(conn).unwrap(),
        SqliteTallyLedger::try_new(conn).unwrap(),
    )
}

fn points_of(conn: &Connection, menu_id: MenuId) -> i64 {
    conn.query_row(
        "SELECT points_total FROM menus WHERE id = ?1;",
        [menu_id],
        |row| row.get(0),
    )
    .unwrap()
}

fn ballot_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM ballots;", [], |row| row.get(0))
        .unwrap()
}

fn set_points(conn: &Connection, menu_id: MenuId, points: i64) {
    conn.execute(
        "UPDATE menus SET points_total = ?1 WHERE id = ?2;",
        params![points, menu_id],
    )
    .unwrap();
}

#[test]
fn single_vote_adds_one_point_and_one_ballot() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());
    let menu = fixture.menus[0];

    let receipt = service(&conn)
        .submit_vote(&VoteRequest::single(menu, fixture.employee), today())
        .unwrap();

    assert_eq!(receipt.mode, SubmissionMode::Single);
    assert_eq!(receipt.ballots.len(), 1);
    assert_eq!(receipt.ballots[0].points, Points::SINGLE);
    assert_eq!(points_of(&conn, menu), 1);

    let ledger = SqliteTallyLedger::try_new(&conn).unwrap();
    assert!(ledger.has_ballot(fixture.employee, menu, today()).unwrap());
    assert_eq!(ledger.ballots_for_day(today()).unwrap(), receipt.ballots);
}

#[test]
fn batch_vote_adds_ranked_points_to_each_menu() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 3, today());
    let (a, b, c) = (fixture.menus[0], fixture.menus[1], fixture.menus[2]);
    set_points(&conn, a, 5);
    set_points(&conn, b, 3);
    set_points(&conn, c, 5);

    let request = VoteRequest::batch(
        fixture.employee,
        vec![BatchEntry::new(a, 1), BatchEntry::new(b, 2), BatchEntry::new(c, 3)],
    );
    let receipt = service(&conn).submit_vote(&request, today()).unwrap();

    assert_eq!(receipt.mode, SubmissionMode::Batch);
    assert_eq!(receipt.ballots.len(), 3);
    assert_eq!(points_of(&conn, a), 6);
    assert_eq!(points_of(&conn, b), 5);
    assert_eq!(points_of(&conn, c), 8);
    assert_eq!(ballot_count(&conn), 3);

    let ledger = SqliteTallyLedger::try_new(&conn).unwrap();
    let mine = ledger
        .ballots_for_employee(fixture.employee, today())
        .unwrap();
    let shape: Vec<(MenuId, u32)> = mine.iter().map(|b| (b.menu_id, b.points.get())).collect();
    assert_eq!(shape, vec![(a, 1), (b, 2), (c, 3)]);
}

#[test]
fn unknown_menu_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());

    let err = service(&conn)
        .submit_vote(&VoteRequest::single(999, fixture.employee), today())
        .unwrap_err();

    assert!(matches!(err, VoteError::InvalidMenu(Some(999))));
    assert_eq!(ballot_count(&conn), 0);
    assert_eq!(points_of(&conn, fixture.menus[0]), 0);
}

#[test]
fn unknown_employee_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());

    let err = service(&conn)
        .submit_vote(&VoteRequest::single(fixture.menus[0], 999), today())
        .unwrap_err();

    assert!(matches!(err, VoteError::InvalidEmployee(Some(999))));
    assert_eq!(ballot_count(&conn), 0);
}

#[test]
fn batch_with_two_entries_is_rejected_without_mutation() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2, today());

    let request = VoteRequest::batch(
        fixture.employee,
        vec![
            BatchEntry::new(fixture.menus[0], 1),
            BatchEntry::new(fixture.menus[1], 2),
        ],
    );
    let err = service(&conn).submit_vote(&request, today()).unwrap_err();

    assert!(matches!(err, VoteError::InvalidVoteData(_)));
    assert_eq!(ballot_count(&conn), 0);
    assert_eq!(points_of(&conn, fixture.menus[0]), 0);
}

#[test]
fn batch_with_invalid_last_entry_applies_nothing() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 3, today());

    let request = VoteRequest::batch(
        fixture.employee,
        vec![
            BatchEntry::new(fixture.menus[0], 3),
            BatchEntry::new(fixture.menus[1], 2),
            BatchEntry {
                menu_id: Some(fixture.menus[2]),
                points: Some(PointsInput::NotInteger),
            },
        ],
    );
    let err = service(&conn).submit_vote(&request, today()).unwrap_err();

    assert!(matches!(err, VoteError::InvalidVoteData(_)));
    assert_eq!(ballot_count(&conn), 0);
    for menu in &fixture.menus {
        assert_eq!(points_of(&conn, *menu), 0);
    }
}

#[test]
fn second_vote_for_same_menu_is_a_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());
    let service = service(&conn);
    let request = VoteRequest::single(fixture.menus[0], fixture.employee);

    service.submit_vote(&request, today()).unwrap();
    let err = service.submit_vote(&request, today()).unwrap_err();

    assert!(matches!(err, VoteError::DuplicateVote { .. }));
    assert!(err.is_duplicate());
    assert_eq!(points_of(&conn, fixture.menus[0]), 1);
    assert_eq!(ballot_count(&conn), 1);
}

#[test]
fn same_employee_may_vote_again_on_another_day() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());
    let service = service(&conn);
    let request = VoteRequest::single(fixture.menus[0], fixture.employee);
    let tomorrow = today().succ_opt().unwrap();

    service.submit_vote(&request, today()).unwrap();
    service.submit_vote(&request, tomorrow).unwrap();

    assert_eq!(points_of(&conn, fixture.menus[0]), 2);
}

#[test]
fn batch_after_single_vote_on_one_of_its_menus_is_rejected_whole() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 3, today());
    let service = service(&conn);

    service
        .submit_vote(&VoteRequest::single(fixture.menus[2], fixture.employee), today())
        .unwrap();
    let request = VoteRequest::batch(
        fixture.employee,
        vec![
            BatchEntry::new(fixture.menus[0], 1),
            BatchEntry::new(fixture.menus[1], 2),
            BatchEntry::new(fixture.menus[2], 3),
        ],
    );
    let err = service.submit_vote(&request, today()).unwrap_err();

    assert!(matches!(err, VoteError::DuplicateVote { menu_id } if menu_id == fixture.menus[2]));
    assert_eq!(points_of(&conn, fixture.menus[0]), 0);
    assert_eq!(points_of(&conn, fixture.menus[1]), 0);
    assert_eq!(points_of(&conn, fixture.menus[2]), 1);
}

#[test]
fn unsupported_request_version_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 1, today());

    let err = service(&conn)
        .submit_vote(
            &VoteRequest::Unsupported {
                build_version: Some("v3".to_string()),
            },
            today(),
        )
        .unwrap_err();

    assert!(matches!(err, VoteError::InvalidRequestVersion { .. }));
    assert_eq!(ballot_count(&conn), 0);
}

#[test]
fn ledger_rolls_back_whole_batch_on_uniqueness_conflict() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2, today());
    let ledger = SqliteTallyLedger::try_new(&conn).unwrap();
    let vote = |menu_id: MenuId, points: i64| AcceptedVote {
        menu_id,
        employee_id: fixture.employee,
        day: today(),
        points: Points::new(points).unwrap(),
    };

    let err = ledger
        .apply_batch(&[
            vote(fixture.menus[0], 2),
            vote(fixture.menus[1], 1),
            vote(fixture.menus[0], 3),
        ])
        .unwrap_err();

    assert!(matches!(err, LedgerError::DuplicateBallot { menu_id, .. } if menu_id == fixture.menus[0]));
    assert_eq!(ballot_count(&conn), 0);
    assert_eq!(points_of(&conn, fixture.menus[0]), 0);
    assert_eq!(points_of(&conn, fixture.menus[1]), 0);
}

#[test]
fn ledger_reports_missing_menu_and_employee() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1, today());
    let ledger = SqliteTallyLedger::try_new(&conn).unwrap();

    let missing_menu = AcceptedVote {
        menu_id: 404,
        employee_id: fixture.employee,
        day: today(),
        points: Points::SINGLE,
    };
    assert!(matches!(
        ledger.apply(&missing_menu).unwrap_err(),
        LedgerError::MenuNotFound(404)
    ));

    let missing_employee = AcceptedVote {
        menu_id: fixture.menus[0],
        employee_id: 404,
        ..missing_menu
    };
    assert!(matches!(
        ledger.apply(&missing_employee).unwrap_err(),
        LedgerError::EmployeeNotFound(404)
    ));
    assert_eq!(points_of(&conn, fixture.menus[0]), 0);
}

#[test]
fn tied_menus_all_win() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 3, today());
    let (a, b, c) = (fixture.menus[0], fixture.menus[1], fixture.menus[2]);
    set_points(&conn, a, 5);
    set_points(&conn, b, 3);
    set_points(&conn, c, 5);

    let winners = WinnerService::new(SqliteDirectoryRepository::try_new(&conn).unwrap())
        .winning_menus(today())
        .unwrap();

    let ids: Vec<MenuId> = winners.menus().iter().map(|menu| menu.id).collect();
    assert_eq!(ids, vec![a, c]);
    assert!(winners.is_tie());
}

#[test]
fn day_without_menus_has_no_winner() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, 2, today());

    let tomorrow = today().succ_opt().unwrap();
    let outcome = WinnerService::new(SqliteDirectoryRepository::try_new(&conn).unwrap())
        .winning_menus(tomorrow)
        .unwrap();

    assert_eq!(outcome, WinnerOutcome::NoWinner);
}

#[test]
fn winners_ignore_menus_from_other_days() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2, today());
    let yesterday = today().pred_opt().unwrap();
    conn.execute(
        "UPDATE menus SET created_on = ?1, points_total = 50 WHERE id = ?2;",
        params![yesterday, fixture.menus[0]],
    )
    .unwrap();
    set_points(&conn, fixture.menus[1], 2);

    let outcome = WinnerService::new(SqliteDirectoryRepository::try_new(&conn).unwrap())
        .winning_menus(today())
        .unwrap();

    let ids: Vec<MenuId> = outcome.menus().iter().map(|menu| menu.id).collect();
    assert_eq!(ids, vec![fixture.menus[1]]);
}

#[test]
fn winner_does_not_depend_on_vote_order() {
    let forward = run_votes_in_order(&[0, 1, 2, 3]);
    let reversed = run_votes_in_order(&[3, 2, 1, 0]);
    assert_eq!(forward, reversed);
}

fn run_votes_in_order(order: &[usize]) -> Vec<MenuId> {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 3, today());
    let directory = DirectoryService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());
    let voters: Vec<EmployeeId> = (0..4)
        .map(|index| {
            directory
                .register_employee(&RegisterEmployeeRequest {
                    employee_code: format!("voter-{index}"),
                    display_name: format!("Voter {index}"),
                    organization: "Test org".to_string(),
                    role: "Test role".to_string(),
                    date_of_joining: None,
                })
                .unwrap()
                .id
        })
        .collect();
    let (a, b, c) = (fixture.menus[0], fixture.menus[1], fixture.menus[2]);
    let ballots = [
        vec![BatchEntry::new(a, 3), BatchEntry::new(b, 2), BatchEntry::new(c, 1)],
        vec![BatchEntry::new(a, 1), BatchEntry::new(b, 3), BatchEntry::new(c, 2)],
        vec![BatchEntry::new(a, 2), BatchEntry::new(b, 1), BatchEntry::new(c, 3)],
        vec![BatchEntry::new(a, 3), BatchEntry::new(b, 3), BatchEntry::new(c, 1)],
    ];

    let service = service(&conn);
    for &index in order {
        service
            .submit_vote(&VoteRequest::batch(voters[index], ballots[index].clone()), today())
            .unwrap();
    }

    let tally = service.current_tally(today()).unwrap();
    assert_eq!(tally.iter().map(|entry| entry.ballot_count).sum::<u32>(), 12);

    WinnerService::new(SqliteDirectoryRepository::try_new(&conn).unwrap())
        .winning_menus(today())
        .unwrap()
        .menus()
        .iter()
        .map(|menu| menu.id)
        .collect()
}
