//! Entity placement and shadow keys.

use log::warn;
use occluder_math::Transform;
use serde::{Deserialize, Serialize};

/// Cast-shadow group an entity gets when it has no `_castShadows` key.
pub const ENTITY_CAST_SHADOWS: i32 = 0;
/// Receive-shadow group an entity gets when it has no `_receiveShadows` key.
pub const ENTITY_RECV_SHADOWS: i32 = 1;

/// A model attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRef {
    /// A sub-model of the level, `*N` in entity keys.
    Bsp(usize),
    /// A model file with an animation frame.
    External { path: String, frame: i32 },
}

/// The parts of an entity the occlusion tree cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDesc {
    pub origin: [f64; 3],
    /// `[pitch, yaw, roll]` in degrees.
    pub angles: [f64; 3],
    pub scale: [f64; 3],
    pub cast_shadows: i32,
    pub recv_shadows: i32,
    pub models: Vec<ModelRef>,
}

impl Default for EntityDesc {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            angles: [0.0; 3],
            scale: [1.0; 3],
            cast_shadows: ENTITY_CAST_SHADOWS,
            recv_shadows: ENTITY_RECV_SHADOWS,
            models: Vec::new(),
        }
    }
}

impl EntityDesc {
    /// Read an entity from its key/value pairs. Later duplicates win.
    pub fn from_key_values<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let value = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
                .map(|(_, v)| *v)
        };

        let mut ent = Self::default();

        if let Some(v) = value("_castShadows").or_else(|| value("_cs")) {
            ent.cast_shadows = parse_int(v);
        }
        if let Some(v) = value("_receiveShadows").or_else(|| value("_rs")) {
            ent.recv_shadows = parse_int(v);
        }
        if let Some(v) = value("origin") {
            ent.origin = parse_vec3(v);
        }

        if let Some(s) = value("modelscale").map(parse_float) {
            if s != 0.0 {
                ent.scale = [s; 3];
            }
        }
        if let Some(v) = value("modelscale_vec") {
            ent.scale = parse_vec3(v);
        }

        if let Some(v) = value("angle") {
            ent.angles[1] = parse_float(v);
        }
        if let Some(v) = value("angles") {
            ent.angles = parse_vec3(v);
        }

        for (key, frame_key) in [("model", "_frame"), ("model2", "_frame2")] {
            let Some(path) = value(key) else {
                continue;
            };
            let frame = value(frame_key).map_or(0, parse_int);
            if let Some(model) = parse_model_ref(path, frame) {
                ent.models.push(model);
            }
        }

        ent
    }

    /// Local-to-world placement of the entity's models.
    pub fn transform(&self) -> Transform {
        Transform::pivoted(self.origin, self.angles, self.scale)
    }
}

fn parse_model_ref(value: &str, frame: i32) -> Option<ModelRef> {
    match value.strip_prefix('*') {
        Some(num) => match num.trim().parse::<usize>() {
            Ok(n) => Some(ModelRef::Bsp(n)),
            Err(_) => {
                warn!("ignoring malformed sub-model reference {value:?}");
                None
            }
        },
        None => Some(ModelRef::External {
            path: value.to_string(),
            frame,
        }),
    }
}

/// Leading integer of `s`, 0 when there is none.
fn parse_int(s: &str) -> i32 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().unwrap_or(0)
}

fn parse_float(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Up to three whitespace-separated floats; missing components are 0.
fn parse_vec3(s: &str) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(s.split_whitespace()) {
        *slot = parse_float(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ent = EntityDesc::from_key_values([("classname", "func_static")]);
        assert_eq!(ent.cast_shadows, ENTITY_CAST_SHADOWS);
        assert_eq!(ent.recv_shadows, ENTITY_RECV_SHADOWS);
        assert_eq!(ent.scale, [1.0; 3]);
        assert!(ent.models.is_empty());
    }

    #[test]
    fn test_shadow_keys_and_aliases() {
        let ent = EntityDesc::from_key_values([("_cs", "3"), ("_rs", "-2")]);
        assert_eq!(ent.cast_shadows, 3);
        assert_eq!(ent.recv_shadows, -2);

        let ent = EntityDesc::from_key_values([("_castShadows", "1"), ("_cs", "5")]);
        assert_eq!(ent.cast_shadows, 1);
    }

    #[test]
    fn test_placement_keys() {
        let ent = EntityDesc::from_key_values([
            ("origin", "16 -32 8"),
            ("angle", "90"),
            ("modelscale", "2"),
        ]);
        assert_eq!(ent.origin, [16.0, -32.0, 8.0]);
        assert_eq!(ent.angles, [0.0, 90.0, 0.0]);
        assert_eq!(ent.scale, [2.0; 3]);

        let ent = EntityDesc::from_key_values([
            ("angle", "90"),
            ("angles", "10 20 30"),
            ("modelscale", "2"),
            ("modelscale_vec", "1 2 3"),
        ]);
        assert_eq!(ent.angles, [10.0, 20.0, 30.0]);
        assert_eq!(ent.scale, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_modelscale_is_ignored() {
        let ent = EntityDesc::from_key_values([("modelscale", "0")]);
        assert_eq!(ent.scale, [1.0; 3]);
    }

    #[test]
    fn test_model_keys() {
        let ent = EntityDesc::from_key_values([
            ("model", "*4"),
            ("model2", "models/mapobjects/lamp.md3"),
            ("_frame2", "7"),
        ]);
        assert_eq!(
            ent.models,
            vec![
                ModelRef::Bsp(4),
                ModelRef::External {
                    path: "models/mapobjects/lamp.md3".into(),
                    frame: 7,
                },
            ]
        );

        let ent = EntityDesc::from_key_values([("model", "*x")]);
        assert!(ent.models.is_empty());
    }

    #[test]
    fn test_parse_int_like_atoi() {
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int(" -3"), -3);
        assert_eq!(parse_int("1.9"), 1);
        assert_eq!(parse_int("x"), 0);
    }
}
