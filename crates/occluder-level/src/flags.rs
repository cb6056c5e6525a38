//! Shader compile flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-shader flags resolved from shader scripts.
    ///
    /// The tracer reads `NODRAW`, `TRANSLUCENT`, `ALPHASHADOW`, `LIGHTFILTER`
    /// and `SKY`; the rest are carried so callers can inspect what a ray
    /// touched.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CompileFlags: u32 {
        const SOLID       = 0x0000_0001;
        const TRANSLUCENT = 0x0000_0002;
        const STRUCTURAL  = 0x0000_0004;
        const HINT        = 0x0000_0008;
        const NODRAW      = 0x0000_0010;
        const LIGHTGRID   = 0x0000_0020;
        const ALPHASHADOW = 0x0000_0040;
        const LIGHTFILTER = 0x0000_0080;
        const VERTEXLIT   = 0x0000_0100;
        const LIQUID      = 0x0000_0200;
        const FOG         = 0x0000_0400;
        const SKY         = 0x0000_0800;
        const ORIGIN      = 0x0000_1000;
        const AREAPORTAL  = 0x0000_2000;
        const ANTIPORTAL  = 0x0000_4000;
        const SKIP        = 0x0000_8000;
        const NOMARKS     = 0x0001_0000;
        const DETAIL      = 0x0800_0000;
    }
}

impl CompileFlags {
    /// Whether surfaces with these flags attenuate light through their image
    /// instead of blocking it outright.
    pub fn is_filter(self) -> bool {
        self.intersects(Self::ALPHASHADOW | Self::LIGHTFILTER)
    }

    /// Whether surfaces with these flags can occlude at all.
    ///
    /// No-draw shaders never cast, and translucent shaders cast only when
    /// they alpha-shadow or light-filter.
    pub fn casts_shadows(self) -> bool {
        if self.contains(Self::NODRAW) {
            return false;
        }
        !self.contains(Self::TRANSLUCENT) || self.is_filter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casting_rules() {
        assert!(CompileFlags::SOLID.casts_shadows());
        assert!(CompileFlags::empty().casts_shadows());
        assert!(!(CompileFlags::SOLID | CompileFlags::NODRAW).casts_shadows());
        assert!(!CompileFlags::TRANSLUCENT.casts_shadows());
        assert!((CompileFlags::TRANSLUCENT | CompileFlags::ALPHASHADOW).casts_shadows());
        assert!((CompileFlags::TRANSLUCENT | CompileFlags::LIGHTFILTER).casts_shadows());
    }
}
