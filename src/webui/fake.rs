//! In-memory `WebUiApi` used by unit tests across the crate.

use crate::{
    error::{BotError, Result},
    models::{
        GenerationRequest, GenerationResult, InterrogateModel, SamplerEntry, SdModelEntry,
        WebUiOptions,
    },
    webui::traits::WebUiApi,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct CallCounts {
    pub sd_models: AtomicUsize,
    pub options: AtomicUsize,
    pub set_options: AtomicUsize,
    pub samplers: AtomicUsize,
    pub txt2img: AtomicUsize,
    pub interrogate: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeWebUi {
    pub models: Mutex<Vec<SdModelEntry>>,
    pub checkpoint: Mutex<Option<String>>,
    pub samplers: Vec<String>,
    pub caption: Option<String>,
    pub fail_txt2img: bool,
    pub fail_options: bool,
    /// Checkpoint the WebUI switches to while a txt2img call runs.
    pub switch_on_generate: Mutex<Option<String>>,
    pub last_request: Mutex<Option<GenerationRequest>>,
    pub calls: CallCounts,
}

pub fn entry(model_name: &str, title: &str) -> SdModelEntry {
    SdModelEntry {
        model_name: model_name.to_string(),
        title: title.to_string(),
        hash: None,
        filename: None,
    }
}

impl FakeWebUi {
    pub fn new() -> Self {
        Self {
            models: Mutex::new(vec![
                entry("v1-5-pruned", "v1-5-pruned.safetensors [6ce0161689]"),
                entry("anything-v3", "anything-v3.ckpt [8712e20a5d]"),
                entry("dreamshaper_8", "dreamshaper_8.safetensors [879db523c3]"),
            ]),
            checkpoint: Mutex::new(Some("anything-v3.ckpt [8712e20a5d]".to_string())),
            samplers: vec!["Euler a".into(), "Euler".into(), "DPM++ 2M Karras".into()],
            caption: Some("1girl, solo, smile".to_string()),
            fail_txt2img: false,
            fail_options: false,
            switch_on_generate: Mutex::new(None),
            last_request: Mutex::new(None),
            calls: CallCounts::default(),
        }
    }

    pub fn with_caption(mut self, caption: Option<&str>) -> Self {
        self.caption = caption.map(String::from);
        self
    }

    pub fn with_failing_txt2img(mut self) -> Self {
        self.fail_txt2img = true;
        self
    }

    pub fn with_failing_options(mut self) -> Self {
        self.fail_options = true;
        self
    }

    pub fn switch_checkpoint_on_generate(&self, checkpoint: &str) {
        *self.switch_on_generate.lock().unwrap() = Some(checkpoint.to_string());
    }

    pub fn replace_models(&self, models: Vec<SdModelEntry>) {
        *self.models.lock().unwrap() = models;
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebUiApi for FakeWebUi {
    async fn list_sd_models(&self) -> Result<Vec<SdModelEntry>> {
        self.calls.sd_models.fetch_add(1, Ordering::SeqCst);
        Ok(self.models.lock().unwrap().clone())
    }

    async fn get_options(&self) -> Result<WebUiOptions> {
        self.calls.options.fetch_add(1, Ordering::SeqCst);
        if self.fail_options {
            return Err(BotError::RemoteCall("options are unavailable".into()));
        }
        Ok(WebUiOptions {
            sd_model_checkpoint: self.checkpoint.lock().unwrap().clone(),
            extra: Map::new(),
        })
    }

    async fn set_options(&self, options: Map<String, Value>) -> Result<()> {
        self.calls.set_options.fetch_add(1, Ordering::SeqCst);
        if let Some(checkpoint) = options.get("sd_model_checkpoint").and_then(Value::as_str) {
            *self.checkpoint.lock().unwrap() = Some(checkpoint.to_string());
        }
        Ok(())
    }

    async fn list_samplers(&self) -> Result<Vec<SamplerEntry>> {
        self.calls.samplers.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .samplers
            .iter()
            .map(|name| SamplerEntry {
                name: name.clone(),
                aliases: vec![],
            })
            .collect())
    }

    async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.calls.txt2img.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail_txt2img {
            return Err(BotError::RemoteCall("CUDA out of memory".into()));
        }
        if let Some(checkpoint) = self.switch_on_generate.lock().unwrap().take() {
            *self.checkpoint.lock().unwrap() = Some(checkpoint);
        }

        // batches come back with the composite grid first
        let count = if request.batch_size > 1 {
            request.batch_size + 1
        } else {
            1
        };
        let images = (0..count).map(|i| vec![i as u8]).collect();
        let seed = if request.seed < 0 { 3_141_592 } else { request.seed };
        let info = json!({ "seed": seed }).as_object().cloned().unwrap_or_default();
        Ok(GenerationResult { images, info })
    }

    async fn interrogate(&self, model: InterrogateModel, _image: &[u8]) -> Result<String> {
        self.calls.interrogate.fetch_add(1, Ordering::SeqCst);
        match &self.caption {
            Some(caption) => Ok(format!("{} ({})", caption, model.api_name())),
            None => Err(BotError::RemoteCall(format!(
                "interrogator {} is not available",
                model.api_name()
            ))),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
