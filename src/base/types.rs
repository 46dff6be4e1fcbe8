use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_with::{DefaultOnError, DeserializeAs, DisplayFromStr, PickFirst, serde_as};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// The compute device the classifier was bound to at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

/// A single ranked label returned by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self { label: label.into(), score }
    }
}

/// Body of a `POST /predict` request.
///
/// Both fields are optional; a missing `symptoms` is treated the same as an empty one.
/// `top_k` accepts a JSON integer, an integer-looking string, or a float (truncated).
/// Any other `top_k` is ignored rather than failing the whole body.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr, TruncatedFloat)>>>")]
    pub top_k: Option<i64>,
}

/// Reads a finite JSON number as an integer, dropping the fractional part.
pub struct TruncatedFloat;

impl<'de> DeserializeAs<'de, i64> for TruncatedFloat {
    fn deserialize_as<D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;

        if !value.is_finite() {
            return Err(D::Error::custom(format!("{value} is not a usable count")));
        }

        Ok(value.trunc() as i64)
    }
}

/// A single enriched prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub disease: String,
    pub score: f64,
    pub specialty: String,
    pub follow_up: Vec<String>,
}

/// Successful classification response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub input: String,
    pub results: Vec<Prediction>,
}

/// Response for inputs that matched the greeting set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub message: String,
}

/// Liveness response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub device: ComputeDevice,
}

/// Error payload; `details` is only present for server-side failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}
