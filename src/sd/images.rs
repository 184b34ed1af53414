//! Base64 / data-URI handling and PNG metadata embedding.
//!
//! The WebUI returns images as base64 strings (sometimes wrapped in a data
//! URI) and records generation parameters in a PNG text chunk keyed
//! `parameters`. This module converts between those representations.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use thiserror::Error;

/// PNG text-chunk keyword the WebUI stores generation parameters under.
pub const PARAMETERS_KEYWORD: &str = "parameters";

/// Errors from re-encoding a PNG with embedded parameters.
#[derive(Debug, Error)]
pub enum PngTextError {
    #[error("Failed to decode PNG image: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("Failed to encode PNG image: {0}")]
    Encode(#[from] png::EncodingError),
}

/// Strip a leading `data:<mime>;base64,` marker, if present.
///
/// Strings without a `data:` scheme are returned untouched, as are malformed
/// data URIs missing the `base64,` marker.
pub fn strip_data_uri_prefix(data: &str) -> &str {
    if !data.starts_with("data:") {
        return data;
    }
    match data.split_once("base64,") {
        Some((_, encoded)) => encoded,
        None => data,
    }
}

/// Wrap raw base64 PNG data in the data-URI form `png-info` expects.
pub fn to_data_uri(base64_png: &str) -> String {
    format!("data:image/png;base64,{base64_png}")
}

/// Decode a base64 image, tolerating a data-URI prefix and stray whitespace.
pub fn decode_base64_image(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64_STANDARD.decode(strip_data_uri_prefix(data).trim())
}

/// Base64-encode raw image bytes.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Re-encode a PNG with the generation-parameters text embedded.
///
/// Pixel data, bit depth, color type, palette and transparency are carried
/// over unchanged; only the `parameters` text chunk is added. Latin-1 text
/// goes into a tEXt chunk (the WebUI's own format); anything else uses iTXt,
/// which tools in the ecosystem read equally.
pub fn embed_parameters(png_bytes: &[u8], parameters: &str) -> Result<Vec<u8>, PngTextError> {
    let mut decoder = png::Decoder::new(Cursor::new(png_bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let mut data = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut data)?;
    data.truncate(frame.buffer_size());
    let source_info = reader.info();

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(frame.color_type);
        encoder.set_depth(frame.bit_depth);
        if let Some(palette) = source_info.palette.as_ref() {
            encoder.set_palette(palette.clone().into_owned());
        }
        if let Some(trns) = source_info.trns.as_ref() {
            encoder.set_trns(trns.clone().into_owned());
        }

        if is_latin1(parameters) {
            encoder.add_text_chunk(PARAMETERS_KEYWORD.to_string(), parameters.to_string())?;
        } else {
            encoder.add_itxt_chunk(PARAMETERS_KEYWORD.to_string(), parameters.to_string())?;
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
    }

    Ok(out)
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}
