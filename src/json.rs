use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decodes `bytes` as `T`, accepting only a top-level JSON object.
///
/// Derived struct deserializers also accept arrays; payloads here must be
/// objects, so anything else is rejected before field decoding.
pub fn decode_object<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}
