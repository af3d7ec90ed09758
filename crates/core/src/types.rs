use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The four-field label produced for every classified sample.
///
/// Serialized in camelCase because that is the shape the inference prompt
/// asks the model to emit and the shape stored in `gemini_analysis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub waste_type: String,
    pub classification: String,
    pub recommendations: String,
    pub recycling_tips: String,
}

impl ClassificationResult {
    pub fn new(
        waste_type: impl Into<String>,
        classification: impl Into<String>,
        recommendations: impl Into<String>,
        recycling_tips: impl Into<String>,
    ) -> Self {
        Self {
            waste_type: waste_type.into(),
            classification: classification.into(),
            recommendations: recommendations.into(),
            recycling_tips: recycling_tips.into(),
        }
    }
}

/// An encoded still image together with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Wrap JPEG bytes.
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "image/jpeg")
    }

    /// Decode a `data:<mime>;base64,<payload>` URL.
    ///
    /// Returns `None` when the prefix is missing or the payload is not valid base64.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime = meta.strip_suffix(";base64")?;
        let bytes = BASE64.decode(payload.trim()).ok()?;
        Some(Self::new(bytes, mime))
    }

    /// Decode a bare base64 payload and tag it with the given MIME type.
    pub fn from_base64(payload: &str, mime_type: &str) -> Option<Self> {
        let bytes = BASE64.decode(payload.trim()).ok()?;
        Some(Self::new(bytes, mime_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// File extension matching the MIME type, used when naming stored objects.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One captured photo of a waste item.
///
/// Owned by the deposit pipeline until it is handed to the persistence adapter.
#[derive(Debug, Clone)]
pub struct WasteSample {
    pub image: EncodedImage,
    pub captured_at: OffsetDateTime,
}

impl WasteSample {
    pub fn new(image: EncodedImage) -> Self {
        Self {
            image,
            captured_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_serializes_camel_case() {
        let result = ClassificationResult::new("PET", "bottle", "rinse", "crush");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["wasteType"], "PET");
        assert_eq!(json["recyclingTips"], "crush");
        assert!(json.get("waste_type").is_none());
    }

    #[test]
    fn data_url_round_trip_keeps_mime() {
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        let parsed = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(parsed, image);
    }

    #[test]
    fn data_url_without_base64_marker_is_rejected() {
        assert!(EncodedImage::from_data_url("data:image/png,abc").is_none());
        assert!(EncodedImage::from_data_url("image/png;base64,abc").is_none());
    }

    #[test]
    fn extension_follows_mime() {
        assert_eq!(EncodedImage::new(vec![], "image/png").extension(), "png");
        assert_eq!(EncodedImage::jpeg(vec![]).extension(), "jpg");
        assert_eq!(
            EncodedImage::new(vec![], "application/octet-stream").extension(),
            "jpg"
        );
    }

    #[test]
    fn debug_hides_bytes() {
        let image = EncodedImage::jpeg(vec![1, 2, 3]);
        let dbg = format!("{:?}", image);
        assert!(dbg.contains("len: 3"));
        assert!(!dbg.contains("[1, 2, 3]"));
    }
}
