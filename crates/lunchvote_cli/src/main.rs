//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `lunchvote_core` linkage.
//! - Print today's tally and winners for the configured database.

use chrono::Local;
use lunchvote_core::db::open_db_with_timeout;
use lunchvote_core::{
    init_logging_from_config, CoreConfig, SqliteDirectoryRepository, SqliteTallyLedger,
    VoteService, WinnerOutcome, WinnerService,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("lunchvote_core ping={}", lunchvote_core::ping());
    println!("lunchvote_core version={}", lunchvote_core::core_version());

    let config = CoreConfig::from_env();
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    match report_today(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lunchvote report failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn report_today(config: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();
    let conn = open_db_with_timeout(&config.db_path, config.busy_timeout)?;
    println!("db={} day={today}", config.db_path.display());

    let votes = VoteService::new(
        SqliteDirectoryRepository::try_new(&conn)?,
        SqliteTallyLedger::try_new(&conn)?,
    );
    for entry in votes.current_tally(today)? {
        println!(
            "menu={} restaurant={} points={} ballots={}",
            entry.menu_id, entry.restaurant_id, entry.points_total, entry.ballot_count
        );
    }

    let winners = WinnerService::new(SqliteDirectoryRepository::try_new(&conn)?);
    match winners.winning_menus(today)? {
        WinnerOutcome::NoWinner => println!("winner=none"),
        outcome => {
            let ids: Vec<String> = outcome.menus().iter().map(|menu| menu.id.to_string()).collect();
            println!("winner={} tie={}", ids.join(","), outcome.is_tie());
        }
    }
    Ok(())
}
