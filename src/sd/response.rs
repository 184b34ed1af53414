//! Response types for the Stable Diffusion WebUI API.
//!
//! Only the fields this server actually consumes are typed strictly; fields
//! the WebUI reports as `null` for built-in entries are `Option`s.

use serde::Deserialize;

/// Response of `txt2img` and `extra-batch-images`: base64-encoded PNGs.
#[derive(Debug, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    pub images: Vec<String>,
}

/// Response of `png-info`: the generation-parameters text embedded in a PNG.
#[derive(Debug, Deserialize)]
pub struct PngInfoResponse {
    #[serde(default)]
    pub info: String,
}

/// One entry of `GET /sdapi/v1/sd-models`.
#[derive(Debug, Clone, Deserialize)]
pub struct SdModel {
    pub title: String,
    pub model_name: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub config: Option<String>,
}

/// One entry of `GET /sdapi/v1/upscalers`.
#[derive(Debug, Clone, Deserialize)]
pub struct SdUpscaler {
    pub name: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_path: Option<String>,
    #[serde(default)]
    pub model_url: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_entry_tolerates_nulls() {
        let json = r#"{
            "title": "sd_xl_base_1.0.safetensors [31e35c80fc]",
            "model_name": "sd_xl_base_1.0",
            "hash": "31e35c80fc",
            "sha256": null,
            "filename": "/models/sd_xl_base_1.0.safetensors",
            "config": null
        }"#;
        let model: SdModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.title, "sd_xl_base_1.0.safetensors [31e35c80fc]");
        assert!(model.sha256.is_none());
    }

    #[test]
    fn test_upscaler_entry_tolerates_nulls() {
        let json = r#"{"name": "Lanczos", "model_name": null, "model_path": null, "model_url": null, "scale": 4}"#;
        let upscaler: SdUpscaler = serde_json::from_str(json).unwrap();
        assert_eq!(upscaler.name, "Lanczos");
        assert_eq!(upscaler.scale, Some(4.0));
    }

    #[test]
    fn test_images_response_defaults_to_empty() {
        let response: ImagesResponse = serde_json::from_str("{}").unwrap();
        assert!(response.images.is_empty());
    }
}
