use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::errors::DomainError;

/// Star rating attached to a review.
///
/// Whole ratings serialize as integers so `5` stays `5` rather than `5.0`
/// when the corpus is rendered back to JSON.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Stars(pub f32);

impl Stars {
    pub fn value(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Stars {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 >= 0.0 {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f32(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Stars {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f32::deserialize(deserializer).map(Stars)
    }
}

impl From<f32> for Stars {
    fn from(value: f32) -> Self {
        Self(value)
    }
}

/// A single professor review as stored in the corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub professor: String,
    pub review: String,
    pub subject: String,
    pub stars: Stars,
}

impl ReviewRecord {
    pub fn new(
        professor: impl Into<String>,
        review: impl Into<String>,
        subject: impl Into<String>,
        stars: impl Into<Stars>,
    ) -> Self {
        Self {
            professor: professor.into(),
            review: review.into(),
            subject: subject.into(),
            stars: stars.into(),
        }
    }

    pub fn metadata(&self) -> ReviewMetadata {
        ReviewMetadata {
            review: self.review.clone(),
            subject: self.subject.clone(),
            stars: self.stars,
        }
    }
}

/// The metadata stored next to each vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub review: String,
    pub subject: String,
    pub stars: Stars,
}

/// A review returned by the vector index for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// Professor name, used as the vector id.
    pub id: String,
    pub metadata: ReviewMetadata,
    /// 1-based position in the provider's similarity order.
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// The fixed review collection loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCorpus {
    source: String,
    reviews: Vec<ReviewRecord>,
}

#[derive(Deserialize, Serialize)]
struct CorpusFile {
    reviews: Vec<ReviewRecord>,
}

impl StaticCorpus {
    pub fn new(source: impl Into<String>, reviews: Vec<ReviewRecord>) -> Self {
        Self {
            source: source.into(),
            reviews,
        }
    }

    pub fn from_json(source: impl Into<String>, json: &str) -> Result<Self, DomainError> {
        let source = source.into();
        let file: CorpusFile = serde_json::from_str(json)
            .map_err(|e| DomainError::config(format!("invalid corpus {}: {}", source, e)))?;
        Ok(Self::new(source, file.reviews))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DomainError::config(format!("failed to read corpus {}: {}", path.display(), e))
        })?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_json(source, &json)
    }

    /// File name the corpus was loaded from, e.g. `reviews.json`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Pretty-printed JSON array of every review, embedded in the system instruction.
    pub fn reviews_json(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(&self.reviews)
            .map_err(|e| DomainError::internal(format!("failed to render corpus: {}", e)))
    }
}
