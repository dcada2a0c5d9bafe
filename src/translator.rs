//! Turns loosely typed command arguments into validated WebUI requests.

use crate::{
    error::{BotError, Result},
    models::{
        ChannelKind, DefaultValue, GenerationDefaults, GenerationRequest, InterrogateModel,
    },
    registry::ModelRegistry,
};
use std::sync::Arc;

pub const CFG_SCALE_BOUNDS: (f64, f64) = (1.0, 14.0);
pub const DIMENSION_BOUNDS: (i64, i64) = (127, 769);
pub const STEPS_BOUNDS: (i64, i64) = (0, 150);
pub const BATCH_BOUNDS: (i64, i64) = (0, 5);
/// Width and height may not both exceed this.
pub const MAX_SQUARE_SIDE: u32 = 512;
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// Arguments of the `create` command. `None` means "use the stored default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateArgs {
    pub prompt: String,
    pub negative: Option<String>,
    pub cfg_scale: Option<f64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub seed: Option<i64>,
    pub steps: Option<i64>,
    pub batch: Option<i64>,
    pub sampler: Option<String>,
    pub show: Option<bool>,
    pub save_image: Option<bool>,
    pub grid: Option<bool>,
    pub hires_fix: Option<bool>,
}

impl CreateArgs {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// A validated `create` call: the WebUI request plus how to present the result.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlan {
    pub request: GenerationRequest,
    pub grid: bool,
    pub show: bool,
}

pub struct RequestTranslator {
    registry: Arc<ModelRegistry>,
}

impl RequestTranslator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Validates `args` against the bounds and the WebUI's sampler list.
    /// Local checks run first so an invalid request never reaches the WebUI.
    pub async fn translate_create_request(
        &self,
        args: &CreateArgs,
        defaults: &GenerationDefaults,
        channel: ChannelKind,
    ) -> Result<CreatePlan> {
        let plan = Self::validate_create(args, defaults, channel)?;

        if let Some(sampler) = &args.sampler {
            let samplers = self.registry.list_sampler_names().await?;
            if !samplers.iter().any(|s| s == sampler) {
                return Err(BotError::NotFound(format!(
                    "Unknown sampler `{}`. Available: {}",
                    sampler,
                    samplers.join(", ")
                )));
            }
        }

        Ok(plan)
    }

    /// Everything `translate_create_request` checks without asking the WebUI.
    pub fn validate_create(
        args: &CreateArgs,
        defaults: &GenerationDefaults,
        channel: ChannelKind,
    ) -> Result<CreatePlan> {
        let prompt = args.prompt.trim();
        if prompt.is_empty() {
            return Err(BotError::Validation("The prompt cannot be empty.".into()));
        }

        let cfg_scale = args.cfg_scale.unwrap_or(defaults.cfg_scale);
        let width = args.width.unwrap_or_else(|| defaults.width.into());
        let height = args.height.unwrap_or_else(|| defaults.height.into());
        let steps = args.steps.unwrap_or_else(|| defaults.steps.into());
        let batch = args.batch.unwrap_or_else(|| defaults.batch.into());
        let hires_fix = args.hires_fix.unwrap_or(defaults.hires_fix);
        let mut grid = args.grid.unwrap_or(defaults.grid);
        let mut show = args.show.unwrap_or(defaults.show);
        let save_image = args.save_image.unwrap_or(defaults.save_image);

        check_float("cfg_scale", cfg_scale, CFG_SCALE_BOUNDS)?;
        let width = check_int("width", width, DIMENSION_BOUNDS)?;
        let height = check_int("height", height, DIMENSION_BOUNDS)?;
        let steps = check_int("steps", steps, STEPS_BOUNDS)?;
        let batch = check_int("batch", batch, BATCH_BOUNDS)?;

        if width > MAX_SQUARE_SIDE && height > MAX_SQUARE_SIDE {
            return Err(BotError::Validation(format!(
                "Width and height cannot be greater than {} at the same time.",
                MAX_SQUARE_SIDE
            )));
        }
        if hires_fix && batch > 1 {
            return Err(BotError::Validation(
                "Hires fix cannot be used with a batch of more than one image.".into(),
            ));
        }
        if grid && batch == 1 {
            grid = false;
        }
        if channel == ChannelKind::Partial {
            show = true;
        }

        let request = GenerationRequest {
            prompt: prompt.to_string(),
            negative_prompt: args.negative.clone().unwrap_or_default(),
            cfg_scale,
            width,
            height,
            seed: args.seed.unwrap_or(defaults.seed),
            steps,
            batch_size: batch,
            sampler_name: args
                .sampler
                .clone()
                .unwrap_or_else(|| defaults.sampler.clone()),
            save_images: save_image || channel.is_persistent(),
            enable_hr: hires_fix,
        };

        Ok(CreatePlan {
            request,
            grid,
            show,
        })
    }

    /// Resolves the checkpoint title to hand to `set_options`.
    pub async fn translate_model_switch(&self, display_name: &str) -> Result<String> {
        let models = self.registry.list_models().await?;
        if !models.iter().any(|m| m == display_name) {
            return Err(BotError::NotFound("Invalid model".into()));
        }
        self.registry
            .resolve_hash_name(display_name)
            .await?
            .ok_or_else(|| BotError::NotFound("Invalid model".into()))
    }

    /// Parses `raw` into the type `name` currently holds and returns the
    /// updated defaults. Nothing but `name` changes.
    pub fn translate_defaults_update(
        name: &str,
        raw: &str,
        current: &GenerationDefaults,
    ) -> Result<GenerationDefaults> {
        let field = GenerationDefaults::field(name).ok_or_else(|| {
            BotError::NotFound(format!(
                "Unknown default parameter `{}`. Known: {}",
                name,
                field_names().join(", ")
            ))
        })?;
        let value: DefaultValue =
            field
                .kind
                .parse(raw)
                .ok_or_else(|| BotError::TypeMismatch {
                    field: name.to_string(),
                    expected: field.kind.as_str().to_string(),
                })?;
        current.with_value(name, value)
    }

    /// Picks what to show from a `txt2img` result. Batches of more than one
    /// image arrive with the composite grid first, unless the WebUI has grids
    /// turned off; a result without the extra grid image is returned as is.
    pub fn select_images<T>(images: Vec<T>, batch_size: u32, grid: bool) -> Vec<T> {
        if batch_size <= 1 || images.len() != batch_size as usize + 1 {
            return images;
        }
        if grid {
            images.into_iter().take(1).collect()
        } else {
            images.into_iter().skip(1).collect()
        }
    }

    /// Checks a describe/recreate attachment and picks the interrogator.
    pub fn translate_describe_request(
        model_choice: Option<&str>,
        filename: Option<&str>,
    ) -> Result<InterrogateModel> {
        let filename = match filename {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(BotError::Validation("You have not provided a file".into())),
        };

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(BotError::Validation("Invalid image".into()));
        }

        match model_choice {
            None => Ok(InterrogateModel::default()),
            Some(choice) => InterrogateModel::parse(choice).ok_or_else(|| {
                BotError::NotFound(format!(
                    "Unknown interrogate model `{}`. Choose one of: {}",
                    choice,
                    InterrogateModel::CHOICES.join(", ")
                ))
            }),
        }
    }
}

fn field_names() -> Vec<&'static str> {
    GenerationDefaults::FIELDS.iter().map(|f| f.name).collect()
}

fn check_float(name: &str, value: f64, (low, high): (f64, f64)) -> Result<f64> {
    if value > low && value < high {
        Ok(value)
    } else {
        Err(BotError::Validation(format!(
            "`{}` must be greater than {} and less than {} (got {}).",
            name, low, high, value
        )))
    }
}

fn check_int(name: &str, value: i64, (low, high): (i64, i64)) -> Result<u32> {
    if value > low && value < high {
        u32::try_from(value).map_err(|_| BotError::Internal(format!("{} out of range", name)))
    } else {
        Err(BotError::Validation(format!(
            "`{}` must be greater than {} and less than {} (got {}).",
            name, low, high, value
        )))
    }
}
