use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use pantry_core::models::GeneratedRecipe;
use pantry_core::service::{ImageGenerator, RecipeGenerator};

const CHAT_MODEL: &str = "gpt-4o-mini";
const IMAGE_MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";
const MAX_COMPLETION_TOKENS: u32 = 500;

pub const GENERATION_FAILED_TEXT: &str = "An error occurred while generating the recipe.";
pub const EMPTY_COMPLETION_TEXT: &str = "No recipe was generated.";

const SYSTEM_PROMPT: &str =
    "You are a professional chef and the executive chef of a three-star restaurant.";

const NEGATIVE_PROMPT: &str = "whole apple, banana peel, fruit skin, raw, unpeeled, plastic, \
                               artificial, cartoon, 3d render, unrealistic";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    rt: tokio::runtime::Handle,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("pantry/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            rt: tokio::runtime::Handle::current(),
        })
    }

    /// Generate recipe text, then an image of the dish it names.
    ///
    /// Only a failure to reach the API is an error. Other text failures become
    /// degraded placeholder text; image failures leave `image_url` empty.
    pub async fn generate_async(&self, ingredients: &[String]) -> Result<GeneratedRecipe> {
        let recipe_text = match self.complete(&recipe_prompt(ingredients)).await {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(GeneratedRecipe::failed(EMPTY_COMPLETION_TEXT)),
            Err(e) if is_unreachable(&e) => {
                return Err(e).context("OpenAI API unreachable");
            }
            Err(e) => {
                tracing::error!("recipe completion failed: {e:#}");
                return Ok(GeneratedRecipe::failed(GENERATION_FAILED_TEXT));
            }
        };

        let image_url = match self.image_async(&dish_image_prompt(&recipe_text)).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("dish image generation failed: {e:#}");
                None
            }
        };

        Ok(GeneratedRecipe::new(recipe_text, image_url))
    }

    pub async fn image_async(&self, prompt: &str) -> Result<String> {
        let body = ImageRequest {
            model: IMAGE_MODEL,
            prompt,
            size: IMAGE_SIZE,
            quality: "standard",
            n: 1,
        };
        let resp: ImageResponse = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach OpenAI image API")?
            .error_for_status()
            .context("OpenAI image API returned an error")?
            .json()
            .await
            .context("Failed to parse OpenAI image response")?;

        resp.data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| anyhow!("OpenAI image response contained no URL"))
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let body = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_completion_tokens: MAX_COMPLETION_TOKENS,
        };
        let resp: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()))
    }
}

fn is_unreachable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_connect() || e.is_timeout())
}

impl RecipeGenerator for OpenAiClient {
    fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe> {
        self.rt.block_on(self.generate_async(ingredients))
    }
}

impl ImageGenerator for OpenAiClient {
    fn generate_image(&self, prompt: &str) -> Result<String> {
        self.rt.block_on(self.image_async(prompt))
    }
}

/// Offline stand-in used when no API key is configured.
pub struct DummyGenerator;

impl RecipeGenerator for DummyGenerator {
    fn generate(&self, ingredients: &[String]) -> Result<GeneratedRecipe> {
        Ok(GeneratedRecipe::new(
            format!("Sample recipe: a dish using {}", ingredients.join(", ")),
            None,
        ))
    }
}

fn recipe_prompt(ingredients: &[String]) -> String {
    let list = ingredients.join(", ");
    format!(
        "Create a simple recipe that children will enjoy, using the ingredients below.\n\
         Use the ingredients closest to their expiry date first, and make use of the rest too.\n\
         Ingredients: {list}\n\n\
         - Keep the method to 3-5 short steps.\n\
         - Cooking time under 30 minutes.\n\
         - Briefly note whether the dish can be frozen.\n\
         - Put the dish name on the first line."
    )
}

/// Dish name from the first line of the recipe, heading marks removed.
fn dish_name(recipe_text: &str) -> String {
    recipe_text
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('#')
        .trim()
        .to_string()
}

/// Visual hints inferred from the method text (everything after the title line).
fn method_hints(recipe_text: &str) -> Vec<&'static str> {
    const HINTS: [(&[&str], &str); 4] = [
        (&["slice", "chop", "dice", "cut"], "sliced"),
        (&["stir-fry", "fry", "saute", "sauté", "grill", "roast"], "stir-fried or grilled"),
        (&["boil", "simmer", "poach"], "boiled or simmered"),
        (&["steam"], "steamed"),
    ];

    let method = recipe_text
        .lines()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    HINTS
        .iter()
        .filter(|(words, _)| words.iter().any(|w| method.contains(w)))
        .map(|(_, hint)| *hint)
        .collect()
}

fn dish_image_prompt(recipe_text: &str) -> String {
    let dish = dish_name(recipe_text);
    let hints = method_hints(recipe_text);
    let hint_line = if hints.is_empty() {
        String::new()
    } else {
        format!("The dish should look {}.\n", hints.join(", "))
    };
    format!(
        "A photorealistic food photo of {dish}, beautifully plated and ready to eat.\n\
         {hint_line}\
         All fruits and vegetables are peeled and properly prepared before plating (no skins, no peels).\n\
         Appetizing presentation, high-quality food photography, professional natural lighting.\n\n\
         Avoid: {NEGATIVE_PROMPT}"
    )
}
