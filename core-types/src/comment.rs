use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::geometry::FaceBox;

/// One entry in an image's sidecar comment.
///
/// Serializes to the `{type, ...}` objects the EXIF UserComment blob stores:
/// `{"type":"comment","data":…}`, `{"type":"tag","name":…}`,
/// `{"type":"person","name":…,"location":"(t,r,b,l)"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Comment {
        data: String,
    },
    Tag {
        name: String,
    },
    Person {
        name: String,
        #[serde(with = "crate::geometry::as_text")]
        location: FaceBox,
    },
}

impl Entity {
    /// Identity key: Tag/Person compare by lowercased name, Comment by text.
    fn identity(&self) -> (u8, String) {
        match self {
            Entity::Comment { data } => (0, data.clone()),
            Entity::Tag { name } => (1, name.to_lowercase()),
            Entity::Person { name, .. } => (2, name.to_lowercase()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Comment { data } => data,
            Entity::Tag { name } | Entity::Person { name, .. } => name,
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// The ordered entity list embedded in an image's EXIF UserComment.
///
/// Holds at most one `Comment`; Tag/Person entries are unique by
/// case-insensitive name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserComment {
    entities: Vec<Entity>,
}

impl UserComment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The free-text comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.entities.iter().find_map(|e| match e {
            Entity::Comment { data } => Some(data.as_str()),
            _ => None,
        })
    }

    /// Replaces the free-text comment, keeping its position when present.
    pub fn set_comment(&mut self, text: impl Into<String>) {
        let data = text.into();
        for e in &mut self.entities {
            if let Entity::Comment { data: existing } = e {
                *existing = data;
                return;
            }
        }
        self.entities.push(Entity::Comment { data });
    }

    /// Adds a Tag or Person; returns false when an equal entity (by
    /// case-insensitive name) is already present. A Comment entity is routed
    /// through `set_comment` and always reported as added.
    pub fn add(&mut self, entity: Entity) -> bool {
        if let Entity::Comment { data } = entity {
            self.set_comment(data);
            return true;
        }
        if self.entities.contains(&entity) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    pub fn remove(&mut self, entity: &Entity) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e != entity);
        before != self.entities.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Tag { name } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn persons(&self) -> impl Iterator<Item = (&str, &FaceBox)> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Person { name, location } => Some((name.as_str(), location)),
            _ => None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
