// SQL safety check CLI
//
// Reads SQL (argument or stdin), validates it against a mode, caps reads and
// prints the prepared batch as JSON. Rejections go to stderr with exit code 2.
//
// Defaults come from NL2SQL_SQL_MODE, NL2SQL_MAX_ROWS and
// NL2SQL_MAX_SQL_STATEMENTS; flags override them.

use anyhow::{Context, Result};
use clap::Parser;
use nl2sql_safety::{Settings, SqlMode, prepare_statements};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "nl2sql-safety",
    about = "Check generated SQL against a safety mode and cap read statements"
)]
struct Cli {
    /// SQL to check; read from stdin when omitted
    sql: Option<String>,

    /// read_only, write_no_delete or write_full
    #[arg(long, short)]
    mode: Option<SqlMode>,

    /// maximum number of statements accepted
    #[arg(long)]
    max_statements: Option<usize>,

    /// row cap appended to read statements
    #[arg(long)]
    max_rows: Option<usize>,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    let mode = cli.mode.unwrap_or(settings.sql_mode);
    let max_statements = cli.max_statements.unwrap_or(settings.max_sql_statements);
    let max_rows = cli.max_rows.unwrap_or(settings.max_rows);
    log::info!(
        "Checking SQL in {} mode (max {} statements, {} rows)",
        mode,
        max_statements,
        max_rows
    );

    let sql = match cli.sql {
        Some(sql) => sql,
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read SQL from stdin")?,
    };

    match prepare_statements(&sql, mode, max_statements, max_rows) {
        Ok(batch) => {
            for warning in &batch.warnings {
                eprintln!("warning: {}", warning);
            }
            let json = serde_json::to_string_pretty(&batch)
                .context("Failed to serialize prepared batch")?;
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("rejected: {}", e);
            Ok(ExitCode::from(2))
        }
    }
}
