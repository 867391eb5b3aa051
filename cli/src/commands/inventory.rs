use anyhow::Result;
use chrono::NaiveDate;
use std::process;
use std::sync::Arc;

use pantry_core::expiry::{ExpiryWindow, classify};
use pantry_core::service::PantryService;

use super::helpers::print_item_table;
use super::run_service;

pub(crate) async fn cmd_inventory(service: &Arc<PantryService>, json: bool) -> Result<()> {
    let inventory = run_service(service, PantryService::inventory).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    if inventory.all.is_empty() {
        eprintln!("No inventory items in table '{}'", service.table());
        process::exit(2);
    }

    print_item_table(&inventory.all);
    let dated = inventory.with_expiry.len();
    let undated = inventory.inventory_only.len();
    println!("{dated} with expiry date, {undated} without");
    Ok(())
}

pub(crate) async fn cmd_expiring(
    service: &Arc<PantryService>,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let inventory = run_service(service, PantryService::inventory).await?;
    let expiring = classify(&inventory.with_expiry, date);

    if json {
        println!("{}", serde_json::to_string_pretty(&expiring)?);
        return Ok(());
    }

    let window = ExpiryWindow::starting(date);
    if expiring.is_empty() {
        eprintln!(
            "Nothing expires between {} and {}",
            window.start, window.end
        );
        process::exit(2);
    }

    println!("Expiring between {} and {}:\n", window.start, window.end);
    print_item_table(&expiring);
    Ok(())
}

pub(crate) async fn cmd_debug(service: &Arc<PantryService>) -> Result<()> {
    let dump = run_service(service, PantryService::debug_dump).await?;
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
