use anyhow::{bail, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use rand::distributions::Alphanumeric;
use rand::Rng;

use upscaler_core::common::mask_code;
use upscaler_core::{QuotaStore, RedisQuotaStore};
use upscaler_types::AccessCodeRecord;

use crate::cli::CodeCommands;

pub async fn handle_code_command(cmd: CodeCommands, redis_url: &str) -> Result<()> {
    let store = RedisQuotaStore::connect(redis_url).await?;
    run_code_command(cmd, &store).await
}

pub(crate) async fn run_code_command(cmd: CodeCommands, store: &dyn QuotaStore) -> Result<()> {
    match cmd {
        CodeCommands::Issue { code, total } => issue_code(store, code, total).await,
        CodeCommands::Show { code, json } => show_code(store, &code, json).await,
        CodeCommands::Enable { code } => set_enabled(store, &code, true).await,
        CodeCommands::Disable { code } => set_enabled(store, &code, false).await,
    }
}

/// `XXXX-XXXX`, uppercase letters and digits.
pub(crate) fn generate_code() -> String {
    let raw: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}-{}", &raw[..4], &raw[4..])
}

async fn issue_code(store: &dyn QuotaStore, code: Option<String>, total: i64) -> Result<()> {
    if total <= 0 {
        bail!("--total must be positive");
    }
    let code = match code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
        Some(code) => {
            if store.get_record(&code).await?.is_some() {
                bail!("Access code {} already exists", mask_code(&code));
            }
            code
        },
        None => generate_code(),
    };

    store.put_record(&code, &AccessCodeRecord::issue(total)).await?;
    println!("{} {} ({} generations)", "Issued".green(), code.bold(), total);
    Ok(())
}

async fn show_code(store: &dyn QuotaStore, code: &str, json: bool) -> Result<()> {
    let Some(record) = store.get_record(code).await? else {
        bail!("Access code not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let status = if record.valid {
        Cell::new("Active").fg(Color::Green)
    } else {
        Cell::new("Disabled").fg(Color::Red)
    };
    let remaining = if record.has_quota() {
        Cell::new(record.remaining)
    } else {
        Cell::new(record.remaining).fg(Color::Yellow)
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Code", "Total", "Remaining", "Status"]);
    table.add_row(vec![Cell::new(code), Cell::new(record.total), remaining, status]);
    println!("{table}");
    Ok(())
}

async fn set_enabled(store: &dyn QuotaStore, code: &str, valid: bool) -> Result<()> {
    if !store.set_valid(code, valid).await? {
        bail!("Access code not found");
    }
    let label = if valid { "Enabled".green() } else { "Disabled".red() };
    println!("{} {}", label, code);
    Ok(())
}
