//! Local file helpers used by the command-line tool.

use crate::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::Path;
use tracing::debug;

/// Re-encodes a YAML document as pretty-printed JSON.
pub fn yaml_str_to_json(yaml: &str) -> Result<String> {
    let value: serde_json::Value = serde_yaml::from_str(yaml)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

pub async fn yaml_to_json(input: &Path, output: &Path) -> Result<()> {
    let yaml = tokio::fs::read_to_string(input).await?;
    let json = yaml_str_to_json(&yaml)?;
    tokio::fs::write(output, json).await?;

    debug!("Converted {} to {}", input.display(), output.display());
    Ok(())
}

/// MIME type for an image path, from its extension.
pub fn image_mime_type(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        other => Err(Error::UnsupportedImage {
            extension: other.to_string(),
            path: path.display().to_string(),
        }),
    }
}

/// `data:<mime>;base64,<payload>` for raw image bytes.
pub fn image_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

pub async fn load_image_data_uri(path: &Path) -> Result<String> {
    let mime_type = image_mime_type(path)?;
    let bytes = tokio::fs::read(path).await?;
    debug!("Read {} bytes of {} from {}", bytes.len(), mime_type, path.display());
    Ok(image_data_uri(mime_type, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_yaml_str_to_json() {
        let yaml = "name: relay\nports:\n  - 8080\n  - 9090\nenabled: true\n";
        let json = yaml_str_to_json(yaml).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value,
            serde_json::json!({"name": "relay", "ports": [8080, 9090], "enabled": true})
        );
    }

    #[test]
    fn test_yaml_str_to_json_rejects_invalid_yaml() {
        assert!(matches!(
            yaml_str_to_json("a: [1, 2"),
            Err(Error::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_yaml_to_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.yaml");
        let output = dir.path().join("output.json");
        tokio::fs::write(&input, "key: value\n").await.unwrap();

        yaml_to_json(&input, &output).await.unwrap();

        let written = tokio::fs::read_to_string(&output).await.unwrap();
        assert_eq!(written, "{\n  \"key\": \"value\"\n}");
    }

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(&PathBuf::from("a.JPG")).unwrap(), "image/jpeg");
        assert_eq!(image_mime_type(&PathBuf::from("a.webp")).unwrap(), "image/webp");
        assert!(matches!(
            image_mime_type(&PathBuf::from("a.bmp")),
            Err(Error::UnsupportedImage { ref extension, .. }) if extension == "bmp"
        ));
        assert!(matches!(
            image_mime_type(&PathBuf::from("noext")),
            Err(Error::UnsupportedImage { .. })
        ));
    }

    #[test]
    fn test_image_data_uri() {
        assert_eq!(
            image_data_uri("image/png", b"\x89PNG"),
            "data:image/png;base64,iVBORw=="
        );
    }
}
