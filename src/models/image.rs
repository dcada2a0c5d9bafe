use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fully validated parameters for one `txt2img` call. Serializes to the
/// WebUI payload as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
    pub seed: i64,
    pub steps: u32,
    pub batch_size: u32,
    pub sampler_name: String,
    pub save_images: bool,
    pub enable_hr: bool,
}

/// Raw `POST /txt2img` response. `info` is a JSON document encoded as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct Txt2ImgResponse {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub info: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub images: Vec<Vec<u8>>,
    pub info: Map<String, Value>,
}

impl GenerationResult {
    /// The seed the backend actually used.
    pub fn seed(&self) -> Option<i64> {
        self.info.get("seed").and_then(Value::as_i64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterrogateRequest {
    pub image: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterrogateResponse {
    #[serde(default)]
    pub caption: String,
}

/// Which interrogator the describe command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterrogateModel {
    DeepBooru,
    Clip,
}

impl InterrogateModel {
    pub const CHOICES: [&'static str; 2] = ["DeepBooru", "CLIP"];

    pub fn parse(choice: &str) -> Option<Self> {
        match choice.to_lowercase().as_str() {
            "deepbooru" | "deepdanbooru" => Some(InterrogateModel::DeepBooru),
            "clip" => Some(InterrogateModel::Clip),
            _ => None,
        }
    }

    /// Identifier the WebUI expects in the `model` field.
    pub fn api_name(&self) -> &'static str {
        match self {
            InterrogateModel::DeepBooru => "deepdanbooru",
            InterrogateModel::Clip => "clip",
        }
    }
}

impl Default for InterrogateModel {
    fn default() -> Self {
        InterrogateModel::DeepBooru
    }
}
