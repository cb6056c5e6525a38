//! JSON scene files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use occluder_level::{EntityDesc, ExternalModel, Level, MemoryModels, MemoryShaders, ShaderInfo};
use occluder_math::Aabb3;
use serde::Deserialize;

/// An entity either as resolved fields or as raw map keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityEntry {
    Keys(BTreeMap<String, String>),
    Desc(EntityDesc),
}

impl EntityEntry {
    fn into_desc(self) -> EntityDesc {
        match self {
            EntityEntry::Keys(keys) => {
                EntityDesc::from_key_values(keys.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
            EntityEntry::Desc(desc) => desc,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SceneFile {
    level: Level,
    #[serde(default)]
    entities: Vec<EntityEntry>,
    #[serde(default)]
    shaders: Vec<ShaderInfo>,
    #[serde(default)]
    models: BTreeMap<String, ExternalModel>,
}

/// A loaded scene with its lookups.
pub struct LoadedScene {
    pub level: Level,
    pub entities: Vec<EntityDesc>,
    pub shaders: MemoryShaders,
    pub models: MemoryModels,
}

impl LoadedScene {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SceneFile = serde_json::from_str(json)?;
        Ok(Self {
            level: file.level,
            entities: file.entities.into_iter().map(EntityEntry::into_desc).collect(),
            shaders: file.shaders.into_iter().collect(),
            models: file.models.into_iter().collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Bounds of every level vertex.
    pub fn bounds(&self) -> Aabb3 {
        let mut bounds = Aabb3::empty();
        for v in &self.level.verts {
            bounds.include_point(&v.position());
        }
        bounds
    }

    pub fn scene(&self) -> occluder::Scene<'_> {
        occluder::Scene::new(&self.level, &self.shaders)
            .with_entities(&self.entities)
            .with_models(&self.models)
    }
}
