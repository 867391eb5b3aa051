use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::cache::{RecipeCache, extract_title};
use crate::error::PantryError;
use crate::expiry::classify;
use crate::merge::merge_raw;
use crate::models::{GeneratedRecipe, MergedFoodItem, MergedInventory, RawItem, RecipeResult};

pub const NOTHING_EXPIRING_TEXT: &str = "No ingredients are close to their expiry date.";
pub const NOTHING_EXPIRING_TITLE: &str = "Nothing expiring soon";

/// How many leading ingredients feed the backfill image prompt.
const IMAGE_PROMPT_INGREDIENTS: usize = 3;

/// Source of raw household records (a managed key-value table in production).
pub trait ItemStore: Send + Sync {
    fn scan_all(&self, table: &str) -> Result<Vec<RawItem>>;
}

/// Text (and optionally image) recipe generation.
///
/// Implementations report soft failures with `GeneratedRecipe::failed`. An
/// `Err` means the generator could not be reached at all.
pub trait RecipeGenerator: Send + Sync {
    fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe>;
}

/// Standalone image generation, returning the image URL.
pub trait ImageGenerator: Send + Sync {
    fn generate_image(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugDump {
    pub raw_data: Vec<RawItem>,
    pub processed_data: MergedInventory,
}

/// Everything the "what should I cook" pipeline produced for one request.
#[derive(Debug, Clone, Serialize)]
pub struct PantryReport {
    pub inventory: MergedInventory,
    pub expiring_soon: Vec<MergedFoodItem>,
    pub ingredients: Vec<String>,
    /// `None` when the generator was unreachable.
    pub recipe: Option<RecipeResult>,
}

pub struct PantryService {
    store: Box<dyn ItemStore>,
    generator: Box<dyn RecipeGenerator>,
    images: Option<Box<dyn ImageGenerator>>,
    cache: RecipeCache,
    table: String,
}

impl PantryService {
    pub fn new(
        store: Box<dyn ItemStore>,
        generator: Box<dyn RecipeGenerator>,
        cache: RecipeCache,
        table: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            images: None,
            cache,
            table: table.into(),
        }
    }

    /// Enable the extra image request for recipes that come back without one.
    #[must_use]
    pub fn with_image_backfill(mut self, images: Box<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn scan(&self) -> Result<Vec<RawItem>, PantryError> {
        self.store
            .scan_all(&self.table)
            .map_err(PantryError::StoreUnavailable)
    }

    pub fn inventory(&self) -> Result<MergedInventory, PantryError> {
        Ok(merge_raw(&self.scan()?))
    }

    pub fn debug_dump(&self) -> Result<DebugDump, PantryError> {
        let raw_data = self.scan()?;
        let processed_data = merge_raw(&raw_data);
        Ok(DebugDump {
            raw_data,
            processed_data,
        })
    }

    /// Scan, merge, find expiring items and produce a recipe for them.
    ///
    /// Only store failures abort; an unreachable generator leaves `recipe`
    /// empty.
    pub fn report(&self, today: NaiveDate) -> Result<PantryReport, PantryError> {
        let inventory = self.inventory()?;
        let expiring_soon = classify(&inventory.with_expiry, today);
        let ingredients = build_ingredients(&inventory.all, &expiring_soon);

        let recipe = match self.get_recipe(&ingredients) {
            Ok(recipe) => Some(recipe),
            Err(e) => {
                tracing::error!("recipe generation failed: {e:#}");
                None
            }
        };

        Ok(PantryReport {
            inventory,
            expiring_soon,
            ingredients,
            recipe,
        })
    }

    /// Return a recipe for `ingredients`, from the cache when the list is unchanged.
    pub fn get_recipe(&self, ingredients: &[String]) -> Result<RecipeResult, PantryError> {
        if ingredients.is_empty() {
            tracing::info!("nothing expiring, skipping recipe generation");
            return Ok(RecipeResult {
                recipe_text: NOTHING_EXPIRING_TEXT.to_string(),
                title: NOTHING_EXPIRING_TITLE.to_string(),
                image_url: None,
            });
        }

        if let Some(cached) = self.cache.lookup(ingredients) {
            return Ok(cached.into());
        }

        tracing::info!(ingredients = ?ingredients, "generating new recipe");
        let generated = self
            .generator
            .generate(ingredients)
            .map_err(PantryError::GeneratorUnavailable)?;

        if generated.degraded {
            tracing::warn!("generator returned a failure placeholder, not caching it");
            return Ok(RecipeResult {
                title: extract_title(&generated.recipe_text),
                recipe_text: generated.recipe_text,
                image_url: None,
            });
        }

        let image_url = match generated.image_url {
            Some(url) => Some(url),
            None => self.backfill_image(ingredients),
        };

        let title = extract_title(&generated.recipe_text);
        let record = self.cache.store(
            ingredients,
            &generated.recipe_text,
            &title,
            image_url.as_deref(),
        );
        Ok(record.into())
    }

    fn backfill_image(&self, ingredients: &[String]) -> Option<String> {
        let images = self.images.as_ref()?;
        tracing::info!("recipe came back without an image, requesting one");
        match images.generate_image(&backfill_image_prompt(ingredients)) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("image generation failed: {e:#}");
                None
            }
        }
    }
}

#[must_use]
pub fn backfill_image_prompt(ingredients: &[String]) -> String {
    let n = ingredients.len().min(IMAGE_PROMPT_INGREDIENTS);
    let featured = ingredients[..n].join(", ");
    format!(
        "A photorealistic food photo of a home-cooked dish made with {featured}, \
         beautifully plated, appetizing presentation, high-quality food photography"
    )
}

/// Ingredient label for an expiring item; the count is shown only when above one.
#[must_use]
pub fn format_expiring(item: &MergedFoodItem) -> String {
    if item.quantity > 1 {
        format!("{} x{}", item.name, item.quantity)
    } else {
        item.name.clone()
    }
}

/// Build the generator's ingredient list.
///
/// Empty when nothing is expiring. Otherwise the expiring labels plus the
/// names of everything else, sorted as one list and de-duplicated. Sorting
/// the whole list means expiring and non-expiring entries interleave
/// alphabetically.
#[must_use]
pub fn build_ingredients(all: &[MergedFoodItem], expiring: &[MergedFoodItem]) -> Vec<String> {
    if expiring.is_empty() {
        return Vec::new();
    }

    let mut ingredients: Vec<String> = expiring.iter().map(format_expiring).collect();
    ingredients.extend(
        all.iter()
            .filter(|item| !expiring.iter().any(|e| e.name == item.name))
            .map(|item| item.name.clone()),
    );
    ingredients.sort();
    ingredients.dedup();
    ingredients
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Clone, Default)]
    struct Calls(Arc<AtomicUsize>);

    impl Calls {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FakeStore {
        items: Option<Vec<Value>>,
        calls: Calls,
    }

    impl ItemStore for FakeStore {
        fn scan_all(&self, table: &str) -> Result<Vec<RawItem>> {
            self.calls.hit();
            assert_eq!(table, "AppTable");
            let items = self
                .items
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))?;
            Ok(items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(m) => Some(m),
                    _ => None,
                })
                .collect())
        }
    }

    const FAILED_TEXT: &str = "Recipe generation failed.";

    struct FakeGenerator {
        text: Option<&'static str>,
        image_url: Option<&'static str>,
        calls: Calls,
    }

    impl RecipeGenerator for FakeGenerator {
        fn generate(&self, _ingredients: &[String]) -> Result<GeneratedRecipe> {
            self.calls.hit();
            match self.text.ok_or_else(|| anyhow!("no route to host"))? {
                FAILED_TEXT => Ok(GeneratedRecipe::failed(FAILED_TEXT)),
                text => Ok(GeneratedRecipe::new(text, self.image_url.map(str::to_string))),
            }
        }
    }

    struct FakeImages {
        fail: bool,
        calls: Calls,
        prompts: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl ImageGenerator for FakeImages {
        fn generate_image(&self, prompt: &str) -> Result<String> {
            self.calls.hit();
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                anyhow::bail!("image service down");
            }
            Ok("http://images/backfill.png".to_string())
        }
    }

    struct Harness {
        service: PantryService,
        store_calls: Calls,
        generator_calls: Calls,
        image_calls: Calls,
        prompts: Arc<std::sync::Mutex<Vec<String>>>,
        _dir: tempfile::TempDir,
    }

    fn harness(
        items: Option<Vec<Value>>,
        text: Option<&'static str>,
        image_url: Option<&'static str>,
        images: Option<bool>,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store_calls = Calls::default();
        let generator_calls = Calls::default();
        let image_calls = Calls::default();
        let prompts = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut service = PantryService::new(
            Box::new(FakeStore {
                items,
                calls: store_calls.clone(),
            }),
            Box::new(FakeGenerator {
                text,
                image_url,
                calls: generator_calls.clone(),
            }),
            RecipeCache::new(dir.path().join("last_recipe.json")),
            "AppTable",
        );
        if let Some(fail) = images {
            service = service.with_image_backfill(Box::new(FakeImages {
                fail,
                calls: image_calls.clone(),
                prompts: Arc::clone(&prompts),
            }));
        }

        Harness {
            service,
            store_calls,
            generator_calls,
            image_calls,
            prompts,
            _dir: dir,
        }
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn food(name: &str, quantity: u32, date: Option<&str>) -> MergedFoodItem {
        MergedFoodItem {
            name: name.to_string(),
            english_key: name.to_lowercase(),
            quantity,
            expiry_date: date.map(str::to_string),
            updated_at: None,
            source_ref: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn empty_ingredients_short_circuit() {
        let h = harness(Some(vec![]), Some("### Soup"), None, Some(false));
        let result = h.service.get_recipe(&[]).unwrap();
        assert_eq!(result.recipe_text, NOTHING_EXPIRING_TEXT);
        assert_eq!(result.title, NOTHING_EXPIRING_TITLE);
        assert!(result.image_url.is_none());
        assert_eq!(h.store_calls.count(), 0);
        assert_eq!(h.generator_calls.count(), 0);
        assert_eq!(h.image_calls.count(), 0);
    }

    #[test]
    fn second_request_with_same_list_uses_cache() {
        let h = harness(None, Some("### Milk Soup\n1. Heat"), Some("http://img/1"), None);
        let ingredients = list(&["Milk", "Rice"]);

        let first = h.service.get_recipe(&ingredients).unwrap();
        let second = h.service.get_recipe(&ingredients).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.title, "Milk Soup");
        assert_eq!(first.image_url.as_deref(), Some("http://img/1"));
        assert_eq!(h.generator_calls.count(), 1);
    }

    #[test]
    fn reordered_list_regenerates() {
        let h = harness(None, Some("**Pilaf**"), Some("http://img/1"), None);
        h.service.get_recipe(&list(&["Milk", "Rice"])).unwrap();
        h.service.get_recipe(&list(&["Rice", "Milk"])).unwrap();
        assert_eq!(h.generator_calls.count(), 2);
    }

    #[test]
    fn corrupt_cache_still_generates() {
        let h = harness(None, Some("**Pilaf**"), None, None);
        std::fs::write(h.service.cache.path(), "]]garbage").unwrap();
        let result = h.service.get_recipe(&list(&["Rice"])).unwrap();
        assert_eq!(result.title, "Pilaf");
        assert_eq!(h.generator_calls.count(), 1);
        assert!(h.service.cache.lookup(&list(&["Rice"])).is_some());
    }

    #[test]
    fn plain_text_gets_default_title() {
        let h = harness(None, Some("Cook the rice with milk."), None, None);
        let result = h.service.get_recipe(&list(&["Rice"])).unwrap();
        assert_eq!(result.title, crate::cache::DEFAULT_TITLE);
    }

    #[test]
    fn missing_image_is_backfilled_from_first_three_ingredients() {
        let h = harness(None, Some("### Stew"), None, Some(false));
        let result = h
            .service
            .get_recipe(&list(&["Beef", "Carrot", "Onion", "Potato"]))
            .unwrap();
        assert_eq!(result.image_url.as_deref(), Some("http://images/backfill.png"));
        assert_eq!(h.image_calls.count(), 1);
        let prompts = h.prompts.lock().unwrap();
        assert!(prompts[0].contains("Beef, Carrot, Onion,"));
        assert!(!prompts[0].contains("Potato"));
    }

    #[test]
    fn backfill_skipped_when_generator_supplied_image() {
        let h = harness(None, Some("### Stew"), Some("http://img/own"), Some(false));
        let result = h.service.get_recipe(&list(&["Beef"])).unwrap();
        assert_eq!(result.image_url.as_deref(), Some("http://img/own"));
        assert_eq!(h.image_calls.count(), 0);
    }

    #[test]
    fn backfill_failure_yields_no_image() {
        let h = harness(None, Some("### Stew"), None, Some(true));
        let result = h.service.get_recipe(&list(&["Beef"])).unwrap();
        assert!(result.image_url.is_none());
        assert_eq!(result.title, "Stew");
        assert_eq!(h.image_calls.count(), 1);
    }

    #[test]
    fn failed_generation_is_returned_but_not_cached() {
        let h = harness(None, Some(FAILED_TEXT), None, Some(false));
        let ingredients = list(&["Milk"]);

        let first = h.service.get_recipe(&ingredients).unwrap();
        let second = h.service.get_recipe(&ingredients).unwrap();

        assert_eq!(first.recipe_text, FAILED_TEXT);
        assert_eq!(second.recipe_text, FAILED_TEXT);
        assert_eq!(first.title, crate::cache::DEFAULT_TITLE);
        assert!(first.image_url.is_none());
        assert_eq!(h.generator_calls.count(), 2);
        assert_eq!(h.image_calls.count(), 0);
        assert!(h.service.cache.lookup(&ingredients).is_none());
    }

    #[test]
    fn unreachable_generator_is_an_error_and_not_cached() {
        let h = harness(None, None, None, None);
        let err = h.service.get_recipe(&list(&["Beef"])).unwrap_err();
        assert!(matches!(err, PantryError::GeneratorUnavailable(_)));
        assert!(h.service.cache.lookup(&list(&["Beef"])).is_none());
    }

    #[test]
    fn store_failure_fails_report() {
        let h = harness(None, Some("### Stew"), None, None);
        let err = h.service.report(today()).unwrap_err();
        assert!(matches!(err, PantryError::StoreUnavailable(_)));
        assert_eq!(h.generator_calls.count(), 0);
    }

    #[test]
    fn report_runs_full_pipeline() {
        let items = vec![
            json!({"sk": "INV#FOOD#milk", "quantity": 1}),
            json!({"sk": "INV#FOOD#rice", "quantity": 2}),
            json!({"sk": "P#1", "type": "pantry", "food_key": "milk", "name": "Milk", "expiryDate": "2026-10-19"}),
            json!({"sk": "P#2", "type": "pantry", "food_key": "rice", "name": "Rice", "expiryDate": "2026-10-29"}),
        ];
        let h = harness(Some(items), Some("### Milk Rice"), None, None);
        let report = h.service.report(today()).unwrap();

        assert_eq!(report.inventory.all.len(), 2);
        let expiring: Vec<&str> = report.expiring_soon.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(expiring, ["Milk"]);
        assert_eq!(report.ingredients, ["Milk", "Rice"]);
        assert_eq!(report.recipe.unwrap().title, "Milk Rice");
    }

    #[test]
    fn report_without_expiring_items_skips_generation() {
        let items = vec![
            json!({"sk": "INV#FOOD#rice", "quantity": 2}),
            json!({"sk": "P#2", "type": "pantry", "food_key": "rice", "name": "Rice", "expiryDate": "2026-12-01"}),
        ];
        let h = harness(Some(items), Some("### Rice"), None, None);
        let report = h.service.report(today()).unwrap();
        assert!(report.expiring_soon.is_empty());
        assert!(report.ingredients.is_empty());
        assert_eq!(report.recipe.unwrap().recipe_text, NOTHING_EXPIRING_TEXT);
        assert_eq!(h.generator_calls.count(), 0);
    }

    #[test]
    fn report_survives_unreachable_generator() {
        let items = vec![
            json!({"sk": "INV#FOOD#milk", "quantity": 1}),
            json!({"sk": "P#1", "type": "pantry", "food_key": "milk", "name": "Milk", "expiryDate": "2026-10-20"}),
        ];
        let h = harness(Some(items), None, None, None);
        let report = h.service.report(today()).unwrap();
        assert_eq!(report.expiring_soon.len(), 1);
        assert!(report.recipe.is_none());
    }

    #[test]
    fn debug_dump_includes_raw_and_merged() {
        let items = vec![
            json!({"sk": "INV#FOOD#milk", "quantity": 3}),
            json!({"sk": "PROFILE"}),
        ];
        let h = harness(Some(items), None, None, None);
        let dump = h.service.debug_dump().unwrap();
        assert_eq!(dump.raw_data.len(), 2);
        assert_eq!(dump.processed_data.inventory_only.len(), 1);
        assert_eq!(h.store_calls.count(), 1);
    }

    #[test]
    fn ingredients_expiring_first_then_sorted_union() {
        let all = vec![food("Milk", 1, Some("2026-10-19")), food("Rice", 1, Some("2026-10-29"))];
        let expiring = vec![all[0].clone()];
        assert_eq!(build_ingredients(&all, &expiring), ["Milk", "Rice"]);
    }

    #[test]
    fn ingredients_interleave_alphabetically() {
        let all = vec![
            food("Apple", 1, None),
            food("Yogurt", 3, Some("2026-10-20")),
            food("Bread", 2, Some("2026-10-21")),
        ];
        let expiring = vec![all[1].clone(), all[2].clone()];
        assert_eq!(
            build_ingredients(&all, &expiring),
            ["Apple", "Bread x2", "Yogurt x3"]
        );
    }

    #[test]
    fn ingredients_dedup_and_empty_without_expiring() {
        let all = vec![food("Rice", 1, None), food("Rice", 1, None), food("Milk", 1, Some("2026-10-19"))];
        let expiring = vec![all[2].clone()];
        assert_eq!(build_ingredients(&all, &expiring), ["Milk", "Rice"]);
        assert!(build_ingredients(&all, &[]).is_empty());
    }

    #[test]
    fn backfill_prompt_with_short_list() {
        let prompt = backfill_image_prompt(&list(&["Tofu"]));
        assert!(prompt.contains("made with Tofu, beautifully plated"));
    }
}
