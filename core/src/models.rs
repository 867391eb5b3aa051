use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort-key prefix marking an inventory record; the remainder is the food key.
pub const INVENTORY_KEY_PREFIX: &str = "INV#FOOD#";

/// Type tag marking a pantry record.
pub const PANTRY_TYPE: &str = "pantry";

/// One record exactly as returned by a table scan.
pub type RawItem = Map<String, Value>;

/// Quantity-only record keyed by `INV#FOOD#<food_key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    pub food_key: String,
    pub quantity: u32,
    pub updated_at: Option<String>,
}

/// Named, dated record that refers to an inventory entry by `food_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PantryRecord {
    pub food_key: String,
    pub name: String,
    pub expiry_date: String,
    pub sort_key: Option<String>,
}

/// A raw item classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRecord {
    Inventory(InventoryRecord),
    Pantry(PantryRecord),
    Unrecognized,
}

impl StoreRecord {
    #[must_use]
    pub fn from_raw(item: &RawItem) -> Self {
        if let Some(record) = inventory_from_raw(item) {
            return Self::Inventory(record);
        }
        if let Some(record) = pantry_from_raw(item) {
            return Self::Pantry(record);
        }
        Self::Unrecognized
    }
}

fn non_empty_str<'a>(item: &'a RawItem, field: &str) -> Option<&'a str> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn inventory_from_raw(item: &RawItem) -> Option<InventoryRecord> {
    let food_key = non_empty_str(item, "sk")?.strip_prefix(INVENTORY_KEY_PREFIX)?;
    let quantity = item.get("quantity").and_then(Value::as_f64)?;
    if !quantity.is_finite() || quantity <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_sign_loss)]
    let quantity = quantity.min(f64::from(u32::MAX)).floor() as u32;

    Some(InventoryRecord {
        food_key: food_key.to_string(),
        quantity,
        updated_at: non_empty_str(item, "updated_at").map(str::to_string),
    })
}

fn pantry_from_raw(item: &RawItem) -> Option<PantryRecord> {
    if item.get("type").and_then(Value::as_str) != Some(PANTRY_TYPE) {
        return None;
    }
    let food_key = non_empty_str(item, "food_key")?;
    let name = non_empty_str(item, "name")?;
    let expiry_date = non_empty_str(item, "expiryDate")
        .or_else(|| non_empty_str(item, "predicted_expiration_date"))?;

    Some(PantryRecord {
        food_key: food_key.to_string(),
        name: name.to_string(),
        expiry_date: expiry_date.to_string(),
        sort_key: non_empty_str(item, "sk").map(str::to_string),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedFoodItem {
    pub name: String,
    pub english_key: String,
    pub quantity: u32,
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedInventory {
    pub inventory_only: Vec<MergedFoodItem>,
    pub with_expiry: Vec<MergedFoodItem>,
    #[serde(rename = "allItems")]
    pub all: Vec<MergedFoodItem>,
}

/// The single persisted recipe slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub ingredients: Vec<String>,
    #[serde(rename = "recipe")]
    pub recipe_text: String,
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Output of a `RecipeGenerator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRecipe {
    pub recipe_text: String,
    pub image_url: Option<String>,
    /// Set when `recipe_text` is a placeholder for a failed generation.
    pub degraded: bool,
}

impl GeneratedRecipe {
    #[must_use]
    pub fn new(recipe_text: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            recipe_text: recipe_text.into(),
            image_url,
            degraded: false,
        }
    }

    /// Placeholder text standing in for a recipe that could not be generated.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            recipe_text: message.into(),
            image_url: None,
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResult {
    pub recipe_text: String,
    pub title: String,
    pub image_url: Option<String>,
}

impl From<CacheRecord> for RecipeResult {
    fn from(record: CacheRecord) -> Self {
        Self {
            recipe_text: record.recipe_text,
            title: record.title,
            image_url: record.image_url,
        }
    }
}
