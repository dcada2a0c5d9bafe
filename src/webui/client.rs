use crate::{
    config::SdAuthConfig,
    error::{BotError, Result},
    models::{
        GenerationRequest, GenerationResult, InterrogateModel, InterrogateRequest,
        InterrogateResponse, SamplerEntry, SdModelEntry, Txt2ImgResponse, WebUiOptions,
    },
    webui::traits::WebUiApi,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct WebUiClient {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl WebUiClient {
    pub fn new(config: &SdAuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BotError::Config(format!("could not build HTTP client: {}", e)))?;

        let credentials = config
            .credentials()
            .map(|(user, pass)| (user.to_string(), pass.to_string()));

        log::info!(
            "WebUI client configured: base_url={}, auth={}",
            config.base_url(),
            credentials.is_some()
        );

        Ok(Self {
            client,
            base_url: config.base_url(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        log::debug!("WebUI GET {}", path);
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| BotError::Request(format!("GET {} failed: {}", path, e)))?;
        Self::read_json(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("WebUI POST {}", path);
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::Request(format!("POST {} failed: {}", path, e)))?;
        Self::read_json(path, response).await
    }

    async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BotError::RemoteCall(format!(
                "{} returned {}: {}",
                path,
                status,
                extract_detail(&text)
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| BotError::Response(format!("{} sent an unexpected body: {}", path, e)))
    }
}

/// The WebUI wraps failures as `{"detail": ...}` or `{"error": ..., "errors": ...}`.
fn extract_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| {
        ["detail", "errors", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str))
    });
    detail.unwrap_or(body).to_string()
}

pub(crate) fn decode_images(encoded: &[String]) -> Result<Vec<Vec<u8>>> {
    encoded
        .iter()
        .map(|image| {
            // Some builds prefix a data URL header
            let payload = image.split_once(',').map_or(image.as_str(), |(_, b)| b);
            STANDARD
                .decode(payload)
                .map_err(|e| BotError::Response(format!("invalid base64 image: {}", e)))
        })
        .collect()
}

pub(crate) fn parse_info(info: Option<&str>) -> Map<String, Value> {
    info.and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
        .unwrap_or_default()
}

#[async_trait]
impl WebUiApi for WebUiClient {
    async fn list_sd_models(&self) -> Result<Vec<SdModelEntry>> {
        self.get_json("sd-models").await
    }

    async fn get_options(&self) -> Result<WebUiOptions> {
        self.get_json("options").await
    }

    async fn set_options(&self, options: Map<String, Value>) -> Result<()> {
        let _: Value = self.post_json("options", &options).await?;
        Ok(())
    }

    async fn list_samplers(&self) -> Result<Vec<SamplerEntry>> {
        self.get_json("samplers").await
    }

    async fn txt2img(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        log::info!(
            "Generating {} image(s) {}x{} with {} steps",
            request.batch_size,
            request.width,
            request.height,
            request.steps
        );
        log::debug!("txt2img payload: {}", serde_json::to_string(request)?);

        let response: Txt2ImgResponse = self.post_json("txt2img", request).await?;
        if response.images.is_empty() {
            return Err(BotError::Response("No images generated".into()));
        }

        Ok(GenerationResult {
            images: decode_images(&response.images)?,
            info: parse_info(response.info.as_deref()),
        })
    }

    async fn interrogate(&self, model: InterrogateModel, image: &[u8]) -> Result<String> {
        let request = InterrogateRequest {
            image: STANDARD.encode(image),
            model: model.api_name().to_string(),
        };
        log::info!("Interrogating {} byte image with {}", image.len(), request.model);

        let response: InterrogateResponse =
            self.post_json("interrogate", &request).await.map_err(|e| match e {
                BotError::RemoteCall(msg) | BotError::Request(msg) | BotError::Response(msg) => {
                    BotError::RemoteCall(msg)
                }
                other => other,
            })?;
        Ok(response.caption)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.authorize(self.client.get(self.url("options"))).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                log::debug!("WebUI health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
