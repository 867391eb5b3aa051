use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::models::CacheRecord;

pub const DEFAULT_TITLE: &str = "Home-cooked recipe";

/// Single-slot store for the most recent generated recipe.
///
/// The slot is advisory: unreadable content counts as a miss and failed
/// writes are logged and ignored.
#[derive(Debug, Clone)]
pub struct RecipeCache {
    path: PathBuf,
}

impl RecipeCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached record if it was generated for exactly `ingredients`.
    #[must_use]
    pub fn lookup(&self, ingredients: &[String]) -> Option<CacheRecord> {
        let record = match self.read() {
            Ok(record) => record?,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable recipe cache: {e:#}");
                return None;
            }
        };

        if record.ingredients == ingredients {
            tracing::info!(title = %record.title, "recipe cache hit");
            Some(record)
        } else {
            tracing::debug!("recipe cache miss: ingredients changed");
            None
        }
    }

    /// Overwrite the slot. The returned record is valid even when the write fails.
    pub fn store(
        &self,
        ingredients: &[String],
        recipe_text: &str,
        title: &str,
        image_url: Option<&str>,
    ) -> CacheRecord {
        let record = CacheRecord {
            ingredients: ingredients.to_vec(),
            recipe_text: recipe_text.to_string(),
            title: title.to_string(),
            image_url: image_url.map(str::to_string),
            generated_at: Utc::now(),
        };

        match self.write(&record) {
            Ok(()) => tracing::info!(path = %self.path.display(), "saved recipe to cache"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to save recipe cache: {e:#}");
            }
        }
        record
    }

    fn read(&self) -> Result<Option<CacheRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no recipe cache yet");
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to read recipe cache"),
        };
        let record = serde_json::from_str(&contents).context("Malformed recipe cache")?;
        Ok(Some(record))
    }

    fn write(&self, record: &CacheRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json).context("Failed to write recipe cache")?;
        Ok(())
    }
}

/// Pick a display title out of generated recipe text.
///
/// A `###` heading anywhere means the first line is the title; otherwise the
/// first `**bold**` span is used.
#[must_use]
pub fn extract_title(recipe_text: &str) -> String {
    let title = if recipe_text.contains("###") {
        recipe_text
            .lines()
            .next()
            .map(|line| line.trim().trim_start_matches('#').trim().to_string())
    } else if recipe_text.contains("**") {
        first_bold_span(recipe_text).map(str::to_string)
    } else {
        None
    };

    title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// First `**...**` pair opened and closed on the same line.
fn first_bold_span(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let (_, rest) = line.split_once("**")?;
        let (span, _) = rest.split_once("**")?;
        Some(span)
    })
}
