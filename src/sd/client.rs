//! Async HTTP client for the Stable Diffusion WebUI API.
//!
//! One [`SdClient`] is built at startup from the environment configuration
//! and shared by every tool. All calls go through the same small set of
//! helpers so authentication, status checking and error mapping live in one
//! place.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::config::SdApiConfig;
use crate::sd::error::{SdApiError, SdApiResult};
use crate::sd::payload::{
    ExtrasBatchPayload, Img2ImgPayload, OptionsPayload, PngInfoPayload, Txt2ImgPayload,
};
use crate::sd::response::{ImagesResponse, PngInfoResponse, SdModel, SdUpscaler};

/// Upper bound on waiting for the WebUI to acknowledge a detached img2img
/// dispatch. The render itself takes far longer; we only need the job queued.
const DETACHED_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared client for the WebUI's `/sdapi/v1` endpoints.
#[derive(Debug, Clone)]
pub struct SdClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
}

impl SdClient {
    /// Build a client from the API configuration.
    pub fn new(config: &SdApiConfig) -> SdApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(SdApiError::Request)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: config.basic_auth(),
        })
    }

    /// POST `/sdapi/v1/txt2img`: render images from a text prompt.
    pub async fn txt2img(&self, payload: &Txt2ImgPayload) -> SdApiResult<ImagesResponse> {
        self.post_json("/sdapi/v1/txt2img", payload).await
    }

    /// POST `/sdapi/v1/png-info`: read the generation parameters the WebUI
    /// recorded for an image. Expects a `data:image/png;base64,` URI.
    pub async fn png_info(&self, image_data_uri: String) -> SdApiResult<PngInfoResponse> {
        let payload = PngInfoPayload {
            image: image_data_uri,
        };
        self.post_json("/sdapi/v1/png-info", &payload).await
    }

    /// GET `/sdapi/v1/sd-models`: list installed checkpoints.
    pub async fn sd_models(&self) -> SdApiResult<Vec<SdModel>> {
        self.get_json("/sdapi/v1/sd-models").await
    }

    /// POST `/sdapi/v1/options`: update WebUI options. Used to switch the
    /// active checkpoint; the call returns once the model is loaded.
    pub async fn set_options(&self, options: &OptionsPayload) -> SdApiResult<()> {
        let response = self
            .authorized(self.http.post(self.url("/sdapi/v1/options")))
            .json(options)
            .send()
            .await
            .map_err(SdApiError::from_reqwest)?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// GET `/sdapi/v1/upscalers`: list available upscalers.
    pub async fn upscalers(&self) -> SdApiResult<Vec<SdUpscaler>> {
        self.get_json("/sdapi/v1/upscalers").await
    }

    /// POST `/sdapi/v1/extra-batch-images`: upscale a batch of images.
    pub async fn extra_batch_images(
        &self,
        payload: &ExtrasBatchPayload,
    ) -> SdApiResult<ImagesResponse> {
        self.post_json("/sdapi/v1/extra-batch-images", payload).await
    }

    /// POST `/sdapi/v1/img2img` without waiting for the render.
    ///
    /// The WebUI queues the job as soon as the request lands, so the caller
    /// can return immediately. The request runs in a detached task on a short
    /// timeout; any outcome, including the expected timeout while the render
    /// is still running, is logged at debug level and otherwise dropped.
    pub fn img2img_detached(&self, payload: Img2ImgPayload) {
        let request = self
            .authorized(self.http.post(self.url("/sdapi/v1/img2img")))
            .timeout(DETACHED_DISPATCH_TIMEOUT)
            .json(&payload);

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    debug!(status = %response.status(), "img2img dispatch acknowledged");
                }
                Err(err) => {
                    debug!(%err, "img2img dispatch ended without a readable response");
                }
            }
        });
    }

    async fn post_json<P, T>(&self, path: &str, payload: &P) -> SdApiResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(payload)
            .send()
            .await
            .map_err(SdApiError::from_reqwest)?;
        let response = Self::check_status(response).await?;
        response.json().await.map_err(SdApiError::from_reqwest)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SdApiResult<T> {
        let response = self
            .authorized(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(SdApiError::from_reqwest)?;
        let response = Self::check_status(response).await?;
        response.json().await.map_err(SdApiError::from_reqwest)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    async fn check_status(response: reqwest::Response) -> SdApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SdApiError::Status { status, body })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(base_url: &str) -> SdApiConfig {
        SdApiConfig {
            base_url: base_url.to_string(),
            auth_user: None,
            auth_pass: None,
            request_timeout_ms: 2_000,
        }
    }

    fn sample_txt2img() -> Txt2ImgPayload {
        Txt2ImgPayload {
            prompt: "a red fox in the snow".to_string(),
            negative_prompt: String::new(),
            steps: 20,
            width: 1024,
            height: 1024,
            cfg_scale: 7.0,
            sampler_name: "Euler".to_string(),
            scheduler: "Simple".to_string(),
            seed: -1,
            n_iter: 1,
            restore_faces: false,
            tiling: false,
            distilled_cfg_scale: 3.5,
        }
    }

    #[tokio::test]
    async fn test_txt2img_posts_payload_and_decodes_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .and(body_partial_json(json!({
                "prompt": "a red fox in the snow",
                "steps": 20,
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "images": ["aGVsbG8="] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = SdClient::new(&config_for(&server.uri())).unwrap();
        let response = client.txt2img(&sample_txt2img()).await.unwrap();
        assert_eq!(response.images, vec!["aGVsbG8=".to_string()]);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/txt2img"))
            .respond_with(ResponseTemplate::new(500).set_body_string("cuda out of memory"))
            .mount(&server)
            .await;

        let client = SdClient::new(&config_for(&server.uri())).unwrap();
        let err = client.txt2img(&sample_txt2img()).await.unwrap_err();
        match err {
            SdApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "cuda out of memory");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_no_response() {
        // Port 1 is reserved and nothing listens on it.
        let client = SdClient::new(&config_for("http://127.0.0.1:1")).unwrap();
        let err = client.sd_models().await.unwrap_err();
        assert!(matches!(err, SdApiError::NoResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_json_body_maps_to_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sdapi/v1/sd-models"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = SdClient::new(&config_for(&server.uri())).unwrap();
        let err = client.sd_models().await.unwrap_err();
        assert!(matches!(err, SdApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_basic_auth_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sdapi/v1/upscalers"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "Lanczos" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let config = SdApiConfig {
            auth_user: Some("user".to_string()),
            auth_pass: Some("pass".to_string()),
            ..config_for(&server.uri())
        };
        let client = SdClient::new(&config).unwrap();
        let upscalers = client.upscalers().await.unwrap();
        assert_eq!(upscalers.len(), 1);
        assert_eq!(upscalers[0].name, "Lanczos");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url_is_tolerated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sdapi/v1/sd-models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "title": "flux1.safetensors [abc123]",
                "model_name": "flux1",
                "filename": "/models/flux1.safetensors",
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/", server.uri());
        let client = SdClient::new(&config_for(&base)).unwrap();
        let models = client.sd_models().await.unwrap();
        assert_eq!(models[0].title, "flux1.safetensors [abc123]");
    }

    #[tokio::test]
    async fn test_set_options_posts_checkpoint_and_ignores_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/options"))
            .and(body_partial_json(json!({
                "sd_model_checkpoint": "flux1.safetensors [abc123]",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .expect(1)
            .mount(&server)
            .await;

        let client = SdClient::new(&config_for(&server.uri())).unwrap();
        let options = OptionsPayload {
            sd_model_checkpoint: "flux1.safetensors [abc123]".to_string(),
        };
        client.set_options(&options).await.unwrap();
    }

    #[tokio::test]
    async fn test_img2img_detached_reaches_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sdapi/v1/img2img"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "images": [] })))
            .mount(&server)
            .await;

        let client = SdClient::new(&config_for(&server.uri())).unwrap();
        client.img2img_detached(Img2ImgPayload {
            init_images: vec!["aGVsbG8=".to_string()],
            prompt: "a red fox".to_string(),
            negative_prompt: String::new(),
            denoising_strength: 0.3,
            steps: 20,
            width: 2048,
            height: 2048,
            cfg_scale: 7.0,
            sampler_name: "Euler".to_string(),
            scheduler: "Simple".to_string(),
            seed: -1,
            hr_upscaler: "R-ESRGAN 4x+".to_string(),
        });

        let mut received = 0;
        for _ in 0..50 {
            received = server
                .received_requests()
                .await
                .map(|r| r.len())
                .unwrap_or(0);
            if received > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(received, 1);
    }

    // Holds a response past the configured timeout; slow by construction.
    #[ignore]
    #[tokio::test]
    async fn test_timeout_maps_to_no_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sdapi/v1/sd-models"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = SdApiConfig {
            request_timeout_ms: 100,
            ..config_for(&server.uri())
        };
        let client = SdClient::new(&config).unwrap();
        let err = client.sd_models().await.unwrap_err();
        assert!(matches!(err, SdApiError::NoResponse(_)), "got {err:?}");
    }
}
