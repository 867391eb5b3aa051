use thiserror::Error;

/// Failures that escape the core to the caller.
///
/// Parse problems (dates, cache contents) never show up here; they are
/// absorbed where they happen.
#[derive(Debug, Error)]
pub enum PantryError {
    #[error("item store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("recipe generator unavailable")]
    GeneratorUnavailable(#[source] anyhow::Error),
}
