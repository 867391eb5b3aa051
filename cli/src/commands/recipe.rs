use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;

use pantry_core::service::PantryService;

use super::helpers::print_item_table;
use super::run_service;

pub(crate) async fn cmd_recipe(
    service: &Arc<PantryService>,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let report = run_service(service, move |s| s.report(date)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !report.expiring_soon.is_empty() {
        println!("Expiring soon:\n");
        print_item_table(&report.expiring_soon);
        let ingredients = report.ingredients.join(", ");
        println!("\nIngredients: {ingredients}\n");
    }

    match report.recipe {
        Some(recipe) => {
            let title = &recipe.title;
            println!("=== {title} ===\n");
            println!("{}", recipe.recipe_text);
            if let Some(url) = recipe.image_url {
                println!("\nImage: {url}");
            }
        }
        None => eprintln!("Recipe generator is unavailable; try again later."),
    }

    Ok(())
}
