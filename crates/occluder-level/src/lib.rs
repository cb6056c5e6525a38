//! Inputs to the occluder light tracer.
//!
//! Everything the occlusion tree consumes but does not own: the compiled
//! level's BSP and draw surfaces, entity placement, resolved shaders and
//! their light images, curved patch tessellation and external models.
//! File formats are out of scope; the types here are plain serde data plus
//! a few small traits for the lookups the tree builder performs.

pub mod bsp;
pub mod entity;
pub mod flags;
pub mod model;
pub mod patch;
pub mod shader;

pub use bsp::{
    BspChild, BspLeaf, BspModel, BspNode, BspPlane, BspShader, DrawSurface, DrawVert, Level,
    SurfaceKind,
};
pub use entity::{EntityDesc, ModelRef, ENTITY_CAST_SHADOWS, ENTITY_RECV_SHADOWS};
pub use flags::CompileFlags;
pub use model::{ExternalModel, MemoryModels, ModelLoader, ModelSurface, ModelSurfaceKind, NoModels};
pub use patch::{BezierTessellator, CurveTessellator, PatchMesh};
pub use shader::{LightImage, MemoryShaders, ShaderInfo, ShaderResolver};
