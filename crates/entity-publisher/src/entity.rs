use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single telemetry record. The publisher never inspects anything beyond
/// what it needs for logging; `info` is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(rename = "createdtime", default)]
    pub created_time: u64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub info: Map<String, Value>,
}

impl Entity {
    /// Create an entity stamped with the current wall-clock time (epoch millis).
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let created_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            created_time,
            info: Map::new(),
        }
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }
}

/// An ordered group of entities handed to the transport in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    pub entities: Vec<Entity>,
}

impl Batch {
    pub fn single(entity: Entity) -> Self {
        Self {
            entities: vec![entity],
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id.as_str())
    }
}

impl From<Vec<Entity>> for Batch {
    fn from(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}
