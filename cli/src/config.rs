use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

const DEFAULT_TABLE: &str = "AppTable";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PORT: u16 = 5000;

pub struct Config {
    pub data_dir: PathBuf,
    pub table: String,
    pub store_dir: PathBuf,
    pub cache_file: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub port: u16,
    pub development: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "pantry").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    fn from_lookup(data_dir: PathBuf, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: '{p}'"))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            table: var("DYNAMO_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            store_dir: var("PANTRY_STORE_DIR").map_or_else(|| data_dir.join("tables"), PathBuf::from),
            cache_file: var("PANTRY_CACHE_FILE")
                .map_or_else(|| data_dir.join("last_recipe.json"), PathBuf::from),
            // "DUMMY" is the placeholder key used in sample env files.
            openai_api_key: var("OPENAI_API_KEY").filter(|k| k != "DUMMY"),
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            port,
            development: var("PANTRY_ENV").is_some_and(|v| v == "development"),
            data_dir,
        })
    }
}
