mod helpers;
mod inventory;
mod recipe;

use anyhow::{Context, Result};
use std::sync::Arc;

use pantry_core::PantryError;
use pantry_core::service::PantryService;

pub(crate) use helpers::parse_date;
pub(crate) use inventory::{cmd_debug, cmd_expiring, cmd_inventory};
pub(crate) use recipe::cmd_recipe;

/// Run a service call on the blocking pool; collaborators block on the runtime.
pub(super) async fn run_service<T, F>(service: &Arc<PantryService>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&PantryService) -> Result<T, PantryError> + Send + 'static,
{
    let service = Arc::clone(service);
    let result = tokio::task::spawn_blocking(move || f(&service))
        .await
        .context("service task panicked")??;
    Ok(result)
}
