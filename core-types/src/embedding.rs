use std::fmt;

use serde::{Deserialize, Serialize};

/// The recognized face-embedding model family.
///
/// Every model produces vectors of a fixed dimensionality; embeddings from
/// different models are never compared against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EmbeddingModel {
    VggFace,
    Facenet,
    Facenet512,
    ArcFace,
    SFace,
}

impl EmbeddingModel {
    pub const ALL: [EmbeddingModel; 5] = [
        EmbeddingModel::VggFace,
        EmbeddingModel::Facenet,
        EmbeddingModel::Facenet512,
        EmbeddingModel::ArcFace,
        EmbeddingModel::SFace,
    ];

    /// The identifier stored in the face dataset.
    pub fn id(self) -> &'static str {
        match self {
            EmbeddingModel::VggFace => "VGG-Face",
            EmbeddingModel::Facenet => "Facenet",
            EmbeddingModel::Facenet512 => "Facenet512",
            EmbeddingModel::ArcFace => "ArcFace",
            EmbeddingModel::SFace => "SFace",
        }
    }

    /// Embedding dimensionality, invariant per model.
    pub fn dim(self) -> usize {
        match self {
            EmbeddingModel::VggFace => 2622,
            EmbeddingModel::Facenet => 128,
            EmbeddingModel::Facenet512 => 512,
            EmbeddingModel::ArcFace => 512,
            EmbeddingModel::SFace => 128,
        }
    }

    /// Default Euclidean match tolerance.
    pub fn threshold(self) -> f32 {
        0.6
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl TryFrom<String> for EmbeddingModel {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        EmbeddingModel::from_id(&raw).ok_or_else(|| format!("unknown embedding model: {raw}"))
    }
}

impl From<EmbeddingModel> for String {
    fn from(m: EmbeddingModel) -> Self {
        m.id().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip() {
        for model in EmbeddingModel::ALL {
            assert_eq!(EmbeddingModel::from_id(model.id()), Some(model));
        }
        assert_eq!(EmbeddingModel::from_id("OpenFace"), None);
    }

    #[test]
    fn serde_uses_the_id_string() {
        let json = serde_json::to_string(&EmbeddingModel::VggFace).unwrap();
        assert_eq!(json, "\"VGG-Face\"");
        let back: EmbeddingModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmbeddingModel::VggFace);
    }
}
