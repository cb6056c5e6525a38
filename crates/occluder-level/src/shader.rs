//! Resolved shader descriptors and their light images.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::CompileFlags;

/// Decoded RGBA image used by alpha-shadow and light-filter shaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightImage {
    pub width: usize,
    pub height: usize,
    /// Row-major RGBA texels, `width * height` of them.
    pub pixels: Vec<[u8; 4]>,
}

impl LightImage {
    /// A single-colour image.
    pub fn solid(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgba; width * height],
        }
    }

    /// Texel at texture coordinates `(s, t)`, wrapping both into `[0, 1)`.
    ///
    /// Returns `None` for an empty or malformed image.
    pub fn sample(&self, s: f64, t: f64) -> Option<[u8; 4]> {
        if self.width == 0 || self.height == 0 || self.pixels.len() < self.width * self.height {
            return None;
        }
        let s = s - s.floor();
        let t = t - t.floor();
        let x = ((s * self.width as f64) as usize).min(self.width - 1);
        let y = ((t * self.height as f64) as usize).min(self.height - 1);
        self.pixels.get(y * self.width + x).copied()
    }
}

/// A shader as the lighting pass sees it: name, compile flags and an
/// optional light image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderInfo {
    pub name: String,
    #[serde(default)]
    pub flags: CompileFlags,
    #[serde(default)]
    pub image: Option<LightImage>,
}

impl ShaderInfo {
    pub fn new(name: impl Into<String>, flags: CompileFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            image: None,
        }
    }

    pub fn with_image(mut self, image: LightImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Resolves shader names to descriptors.
///
/// Returned descriptors are compared by pointer, so a resolver must hand
/// out the same `Arc` for the same shader.
pub trait ShaderResolver {
    fn resolve(&self, name: &str) -> Option<Arc<ShaderInfo>>;
}

/// A resolver over a fixed set of shaders.
#[derive(Debug, Clone, Default)]
pub struct MemoryShaders {
    shaders: HashMap<String, Arc<ShaderInfo>>,
}

impl MemoryShaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: ShaderInfo) -> Arc<ShaderInfo> {
        let info = Arc::new(info);
        self.shaders.insert(info.name.clone(), Arc::clone(&info));
        info
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

impl FromIterator<ShaderInfo> for MemoryShaders {
    fn from_iter<I: IntoIterator<Item = ShaderInfo>>(iter: I) -> Self {
        let mut shaders = Self::new();
        for info in iter {
            shaders.insert(info);
        }
        shaders
    }
}

impl ShaderResolver for MemoryShaders {
    fn resolve(&self, name: &str) -> Option<Arc<ShaderInfo>> {
        self.shaders.get(name).cloned()
    }
}
