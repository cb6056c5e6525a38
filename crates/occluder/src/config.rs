//! Build and trace settings.

use serde::{Deserialize, Serialize};

use crate::error::{OccluderError, Result};

/// Tolerances shared by the clipper, the builder and the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Epsilons {
    /// Half-width of the "on plane" band when clipping windings.
    pub on_plane: f64,
    /// Half-width of the "on plane" band when walking a ray down the tree.
    pub trace_on: f64,
    /// Barycentric slack when testing a ray against a triangle.
    pub bary: f64,
    /// Tighter barycentric slack for filtering surfaces, so seams between
    /// neighbouring triangles do not attenuate twice.
    pub seam: f64,
    /// Minimum `|det|` for a ray/triangle test; smaller means the ray runs
    /// along the triangle's plane.
    pub coplanar: f64,
    /// Hits closer than this on one of the request's own surfaces are
    /// ignored.
    pub self_shadow: f64,
    /// Normal dot product above which a winding counts as lying on a node
    /// plane.
    pub plane_match_dot: f64,
    /// Plane distance difference below which a winding counts as lying on a
    /// node plane.
    pub plane_match_dist: f64,
    /// A filtered ray whose colour channels all fall to this is blocked.
    pub opaque_color: f64,
    /// Segments this short are never blocked.
    pub min_distance: f64,
}

impl Epsilons {
    /// Tolerances matching the classic light compiler.
    pub const DEFAULT: Self = Self {
        on_plane: 0.25,
        trace_on: 0.1,
        bary: 0.01,
        seam: 0.0001,
        coplanar: 0.25,
        self_shadow: 0.5,
        plane_match_dot: 0.999,
        plane_match_dist: 0.001,
        opaque_color: 0.001,
        min_distance: 0.00001,
    };
}

impl Default for Epsilons {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Occlusion tree parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Skip leaf subdivision. Uses far less memory, traces far slower.
    pub low_memory: bool,
    /// Let curved patches cast shadows.
    pub patch_shadows: bool,
    /// Trace against solid space only. Surfaces never block.
    pub no_surfaces: bool,
    /// Leaves holding fewer fan triangles than this are not split.
    pub max_node_triangles: usize,
    /// Leaves whose longest side is at most this are not split.
    pub min_node_size: f64,
    /// Subdivision stops at this depth.
    pub max_tree_depth: usize,
    /// Leaves collected per trace; further leaves are ignored.
    pub max_test_nodes: usize,
    /// Vertex cap for a clipped winding.
    pub max_winding_verts: usize,
    /// Level shader content bits that mark a surface as not drawn.
    pub nodraw_content_flags: u32,
    /// Level shader surface bits that mark a surface as not drawn.
    pub nodraw_surface_flags: u32,
    /// Tolerances.
    pub epsilons: Epsilons,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            low_memory: false,
            patch_shadows: false,
            no_surfaces: false,
            max_node_triangles: 5,
            min_node_size: 32.0,
            max_tree_depth: 32,
            max_test_nodes: 256,
            max_winding_verts: 12,
            nodraw_content_flags: 0,
            nodraw_surface_flags: 0,
            epsilons: Epsilons::DEFAULT,
        }
    }
}

impl BuildSettings {
    /// Parse settings from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_node_triangles == 0 {
            return Err(OccluderError::InvalidSettings(
                "max_node_triangles must be positive".into(),
            ));
        }
        if !self.min_node_size.is_finite() || self.min_node_size < 0.0 {
            return Err(OccluderError::InvalidSettings(
                "min_node_size must be a non-negative number".into(),
            ));
        }
        if self.max_test_nodes == 0 {
            return Err(OccluderError::InvalidSettings(
                "max_test_nodes must be positive".into(),
            ));
        }
        if self.max_winding_verts < 4 {
            return Err(OccluderError::InvalidSettings(
                "max_winding_verts must be at least 4".into(),
            ));
        }

        let e = &self.epsilons;
        let tolerances = [
            ("on_plane", e.on_plane),
            ("trace_on", e.trace_on),
            ("bary", e.bary),
            ("seam", e.seam),
            ("coplanar", e.coplanar),
            ("self_shadow", e.self_shadow),
            ("plane_match_dist", e.plane_match_dist),
            ("opaque_color", e.opaque_color),
            ("min_distance", e.min_distance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(OccluderError::InvalidSettings(format!(
                    "epsilons.{name} must be a non-negative number"
                )));
            }
        }
        if e.seam > e.bary {
            return Err(OccluderError::InvalidSettings(
                "epsilons.seam must not exceed epsilons.bary".into(),
            ));
        }
        if !(e.plane_match_dot > 0.0 && e.plane_match_dot <= 1.0) {
            return Err(OccluderError::InvalidSettings(
                "epsilons.plane_match_dot must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let settings = BuildSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_node_triangles, 5);
        assert_eq!(settings.epsilons.on_plane, 0.25);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut settings = BuildSettings {
            max_test_nodes: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(OccluderError::InvalidSettings(_))
        ));

        settings.max_test_nodes = 256;
        settings.epsilons.bary = -1.0;
        assert!(settings.validate().is_err());

        settings.epsilons = Epsilons {
            seam: 0.5,
            ..Epsilons::DEFAULT
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = BuildSettings::from_toml_str(
            r#"
            low_memory = true
            no_surfaces = true
            min_node_size = 64.0

            [epsilons]
            self_shadow = 1.0
            "#,
        )
        .unwrap();
        assert!(settings.low_memory);
        assert!(settings.no_surfaces);
        assert!(!settings.patch_shadows);
        assert_eq!(settings.min_node_size, 64.0);
        assert_eq!(settings.max_tree_depth, 32);
        assert_eq!(settings.epsilons.self_shadow, 1.0);
        assert_eq!(settings.epsilons.bary, 0.01);
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(matches!(
            BuildSettings::from_toml_str("low_memory = 3"),
            Err(OccluderError::Config(_))
        ));
        assert!(matches!(
            BuildSettings::from_toml_str("max_winding_verts = 3"),
            Err(OccluderError::InvalidSettings(_))
        ));
    }
}
