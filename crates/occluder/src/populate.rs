//! Gathering shadow-casting geometry from the level and its entities.

use log::{debug, info, warn};
use occluder_level::{
    BezierTessellator, BspModel, CompileFlags, CurveTessellator, DrawSurface, DrawVert,
    EntityDesc, ExternalModel, Level, ModelLoader, ModelRef, ModelSurfaceKind, NoModels,
    PatchMesh, ShaderResolver, SurfaceKind,
};
use occluder_math::Transform;

use crate::builder::{trace_vert, Root, TreeBuilder};
use crate::config::BuildSettings;
use crate::error::Result;
use crate::pool::{InfoId, TraceInfo};

static NO_MODELS: NoModels = NoModels;
static BEZIER: BezierTessellator = BezierTessellator {
    max_axis: occluder_level::patch::MAX_EXPANDED_AXIS,
    linear_epsilon: 0.1,
};

/// Everything an occlusion tree is built from.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub level: &'a Level,
    pub entities: &'a [EntityDesc],
    pub shaders: &'a dyn ShaderResolver,
    pub models: &'a dyn ModelLoader,
    pub tessellator: &'a dyn CurveTessellator,
}

impl<'a> Scene<'a> {
    /// A scene with no entities, no external models and Bézier patch
    /// tessellation.
    pub fn new(level: &'a Level, shaders: &'a dyn ShaderResolver) -> Self {
        Self {
            level,
            entities: &[],
            shaders,
            models: &NO_MODELS,
            tessellator: &BEZIER,
        }
    }

    pub fn with_entities(mut self, entities: &'a [EntityDesc]) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_models(mut self, models: &'a dyn ModelLoader) -> Self {
        self.models = models;
        self
    }

    pub fn with_tessellator(mut self, tessellator: &'a dyn CurveTessellator) -> Self {
        self.tessellator = tessellator;
        self
    }
}

/// Feeds every casting surface of a scene into a [`TreeBuilder`].
pub struct Populator<'a> {
    scene: Scene<'a>,
    settings: &'a BuildSettings,
}

impl<'a> Populator<'a> {
    pub fn new(scene: Scene<'a>, settings: &'a BuildSettings) -> Self {
        Self { scene, settings }
    }

    /// Add the world model, then every casting entity's models.
    pub fn populate(&self, builder: &mut TreeBuilder<'_>) -> Result<()> {
        let level = self.scene.level;
        if let Some(world) = level.models.first() {
            self.add_bsp_model(builder, world, &Transform::identity())?;
        }

        for (num, entity) in self.scene.entities.iter().enumerate() {
            if entity.cast_shadows == 0 {
                continue;
            }
            let transform = entity.transform();
            for model in &entity.models {
                match model {
                    ModelRef::Bsp(index) => match level.models.get(*index) {
                        Some(bsp) if *index > 0 => self.add_bsp_model(builder, bsp, &transform)?,
                        _ => warn!("entity {num} references bad bsp model *{index}"),
                    },
                    ModelRef::External { path, frame } => match self.scene.models.load(path, *frame) {
                        Some(m) => self.add_external_model(builder, &m, entity.cast_shadows, &transform)?,
                        None => warn!("entity {num}: unable to load model {path} frame {frame}"),
                    },
                }
            }
        }

        info!("{} shadow casting polygons", builder.stats().input_polygons);
        Ok(())
    }

    /// Add the casting surfaces of one level model.
    pub fn add_bsp_model(
        &self,
        builder: &mut TreeBuilder<'_>,
        model: &BspModel,
        transform: &Transform,
    ) -> Result<()> {
        let level = self.scene.level;
        for i in 0..model.num_surfaces {
            let num = model.first_surface + i;
            let Some(surface) = level.surfaces.get(num) else {
                warn!("bsp model surface {num} is out of range");
                break;
            };
            let Some((info, root)) = self.surface_info(builder, num, surface) else {
                continue;
            };

            match surface.kind {
                SurfaceKind::Patch => self.add_patch(builder, surface, info, root, transform)?,
                SurfaceKind::Planar | SurfaceKind::TriangleSoup => {
                    let (Some(verts), Some(indexes)) =
                        (level.surface_verts(surface), level.surface_indexes(surface))
                    else {
                        warn!("surface {num} has out of range vertices or indexes");
                        continue;
                    };
                    for tri in indexes.chunks_exact(3) {
                        let corners = [
                            verts.get(tri[0] as usize),
                            verts.get(tri[1] as usize),
                            verts.get(tri[2] as usize),
                        ];
                        let [Some(a), Some(b), Some(c)] = corners else {
                            debug!("surface {num} index out of range");
                            continue;
                        };
                        emit(builder, [a, b, c], info, root, transform)?;
                    }
                }
                SurfaceKind::Bad | SurfaceKind::Flare => {}
            }
        }
        Ok(())
    }

    /// Decide whether a level surface casts and, if it does, where to.
    fn surface_info(
        &self,
        builder: &mut TreeBuilder<'_>,
        num: usize,
        surface: &DrawSurface,
    ) -> Option<(InfoId, Root)> {
        if !matches!(
            surface.kind,
            SurfaceKind::Planar | SurfaceKind::TriangleSoup | SurfaceKind::Patch
        ) {
            return None;
        }
        let bsp_shader = self.scene.level.shaders.get(surface.shader)?;
        let Some(shader) = self.scene.shaders.resolve(&bsp_shader.name) else {
            debug!("surface {num}: unresolved shader {}", bsp_shader.name);
            return None;
        };
        if surface.cast_shadows == 0 {
            return None;
        }
        if surface.kind == SurfaceKind::Patch && !self.settings.patch_shadows {
            return None;
        }
        if bsp_shader.content_flags & self.settings.nodraw_content_flags != 0
            || bsp_shader.surface_flags & self.settings.nodraw_surface_flags != 0
        {
            return None;
        }
        if !shader.flags.casts_shadows() {
            return None;
        }

        let root = if surface.skybox_parent.is_some() {
            // the sky inside a portal scene must not block the real sky
            if shader.flags.contains(CompileFlags::SKY) {
                return None;
            }
            Root::Sky
        } else {
            Root::Head
        };

        let info = builder.intern_info(TraceInfo {
            shader,
            surface: Some(num),
            cast_shadows: surface.cast_shadows,
        });
        Some((info, root))
    }

    /// Tessellate a patch and add two triangles per grid quad, alternating
    /// the diagonal in a checkerboard.
    fn add_patch(
        &self,
        builder: &mut TreeBuilder<'_>,
        surface: &DrawSurface,
        info: InfoId,
        root: Root,
        transform: &Transform,
    ) -> Result<()> {
        let Some(verts) = self.scene.level.surface_verts(surface) else {
            warn!("patch has out of range vertices");
            return Ok(());
        };
        let Some(mesh) = PatchMesh::new(surface.patch_width, surface.patch_height, verts.to_vec())
        else {
            warn!(
                "patch size {}x{} does not match {} vertices",
                surface.patch_width,
                surface.patch_height,
                verts.len()
            );
            return Ok(());
        };
        let mesh = self.scene.tessellator.tessellate(&mesh, surface.patch_iterations);

        for y in 0..mesh.height.saturating_sub(1) {
            for x in 0..mesh.width.saturating_sub(1) {
                let quad = [
                    mesh.vert(x, y),
                    mesh.vert(x + 1, y),
                    mesh.vert(x + 1, y + 1),
                    mesh.vert(x, y + 1),
                ];
                let r = (x + y) & 1;
                let corner = |k: usize| quad[(r + k) % 4];
                emit(builder, [corner(0), corner(1), corner(2)], info, root, transform)?;
                emit(builder, [corner(0), corner(2), corner(3)], info, root, transform)?;
            }
        }
        Ok(())
    }

    /// Add the triangle surfaces of an external model placed by an entity.
    pub fn add_external_model(
        &self,
        builder: &mut TreeBuilder<'_>,
        model: &ExternalModel,
        cast_shadows: i32,
        transform: &Transform,
    ) -> Result<()> {
        for surface in &model.surfaces {
            if surface.kind != ModelSurfaceKind::Triangles {
                continue;
            }
            let Some(shader) = self.scene.shaders.resolve(&surface.shader) else {
                debug!("model surface: unresolved shader {}", surface.shader);
                continue;
            };
            if !shader.flags.casts_shadows() {
                continue;
            }
            let info = builder.intern_info(TraceInfo {
                shader,
                surface: None,
                cast_shadows,
            });
            for tri in surface.triangles() {
                emit(builder, [&tri[0], &tri[1], &tri[2]], info, Root::Head, transform)?;
            }
        }
        Ok(())
    }
}

fn emit(
    builder: &mut TreeBuilder<'_>,
    verts: [&DrawVert; 3],
    info: InfoId,
    root: Root,
    transform: &Transform,
) -> Result<()> {
    let verts = verts.map(|v| trace_vert(transform.apply_point(&v.position()), v.st));
    builder.add_triangle(verts, info, root)
}
