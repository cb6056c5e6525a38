//! Externally loaded models placed by entities.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DrawVert;

/// Surface kinds a model file can contain. Only triangle surfaces cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSurfaceKind {
    #[default]
    Triangles,
    Patch,
}

/// One surface of an external model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSurface {
    #[serde(default)]
    pub kind: ModelSurfaceKind,
    pub shader: String,
    pub verts: Vec<DrawVert>,
    pub indexes: Vec<u32>,
}

impl ModelSurface {
    /// Triangle vertex triples; triples with out-of-range indexes are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [DrawVert; 3]> + '_ {
        self.indexes.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.verts.get(tri[0] as usize)?,
                *self.verts.get(tri[1] as usize)?,
                *self.verts.get(tri[2] as usize)?,
            ])
        })
    }
}

/// A decoded model: a list of surfaces for one animation frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalModel {
    pub surfaces: Vec<ModelSurface>,
}

/// Loads external models by path and animation frame.
pub trait ModelLoader {
    fn load(&self, path: &str, frame: i32) -> Option<Arc<ExternalModel>>;
}

/// A loader that never finds anything, for scenes without external models.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModels;

impl ModelLoader for NoModels {
    fn load(&self, _path: &str, _frame: i32) -> Option<Arc<ExternalModel>> {
        None
    }
}

/// A loader over models already held in memory. Frames are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryModels {
    models: HashMap<String, Arc<ExternalModel>>,
}

impl MemoryModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, model: ExternalModel) {
        self.models.insert(path.into(), Arc::new(model));
    }
}

impl FromIterator<(String, ExternalModel)> for MemoryModels {
    fn from_iter<I: IntoIterator<Item = (String, ExternalModel)>>(iter: I) -> Self {
        let mut models = Self::new();
        for (path, model) in iter {
            models.insert(path, model);
        }
        models
    }
}

impl ModelLoader for MemoryModels {
    fn load(&self, path: &str, _frame: i32) -> Option<Arc<ExternalModel>> {
        self.models.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangles_skip_bad_indexes() {
        let surface = ModelSurface {
            kind: ModelSurfaceKind::Triangles,
            shader: "models/box".into(),
            verts: vec![
                DrawVert::new([0.0, 0.0, 0.0], [0.0, 0.0]),
                DrawVert::new([1.0, 0.0, 0.0], [1.0, 0.0]),
                DrawVert::new([0.0, 1.0, 0.0], [0.0, 1.0]),
            ],
            indexes: vec![0, 1, 2, 0, 2, 9, 1],
        };
        let tris: Vec<_> = surface.triangles().collect();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0][1].xyz, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_memory_loader() {
        let models: MemoryModels = [("models/crate.md3".to_string(), ExternalModel::default())]
            .into_iter()
            .collect();
        assert!(models.load("models/crate.md3", 3).is_some());
        assert!(models.load("models/barrel.md3", 0).is_none());
    }
}
