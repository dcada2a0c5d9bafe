use serde::{Deserialize, Serialize};

/// A checkpoint known to the WebUI.
///
/// `display_name` is what users pick from; `hash_name` is the WebUI `title`
/// (e.g. `v1-5-pruned.safetensors [6ce0161689]`) and is the value the
/// `sd_model_checkpoint` option expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub display_name: String,
    pub hash_name: String,
}

impl Model {
    pub fn new(display_name: impl Into<String>, hash_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            hash_name: hash_name.into(),
        }
    }
}

/// Entry of `GET /sd-models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdModelEntry {
    pub model_name: String,
    pub title: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<SdModelEntry> for Model {
    fn from(entry: SdModelEntry) -> Self {
        Model::new(entry.model_name, entry.title)
    }
}

/// Entry of `GET /samplers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The subset of `GET /options` the bot reads. Everything else is kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebUiOptions {
    #[serde(default)]
    pub sd_model_checkpoint: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Where a command was invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A guild text channel. Messages there persist, so generated images are saved.
    Guild,
    /// A direct message with the bot.
    Direct,
    /// A channel the platform only partially resolved (e.g. a DM the bot has no cache for).
    Partial,
}

impl ChannelKind {
    pub fn is_persistent(&self) -> bool {
        matches!(self, ChannelKind::Guild)
    }
}
