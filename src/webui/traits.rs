use crate::{
    error::Result,
    models::{
        GenerationRequest, GenerationResult, InterrogateModel, SamplerEntry, SdModelEntry,
        WebUiOptions,
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The slice of the Stable Diffusion WebUI API the bot talks to.
#[async_trait]
pub trait WebUiApi: Send + Sync {
    async fn list_sd_models(&self) -> Result<Vec<SdModelEntry>>;
    async fn get_options(&self) -> Result<WebUiOptions>;
    async fn set_options(&self, options: Map<String, Value>) -> Result<()>;
    async fn list_samplers(&self) -> Result<Vec<SamplerEntry>>;

    async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Returns the caption produced by the interrogator.
    async fn interrogate(&self, model: InterrogateModel, image: &[u8]) -> Result<String>;

    async fn health_check(&self) -> Result<bool>;
}
