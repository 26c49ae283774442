//! Render-layer visibility gating.
//!
//! Each drawable and each render pass carries a small bitmask of
//! layer indices; a drawable is rendered by a pass iff the masks
//! intersect. Layer 0 is the monoscopic fallback, layers 1 and 2 are
//! the left- and right-eye meshes consumed by per-eye passes.

pub const FALLBACK: u32 = 0;
pub const LEFT_EYE: u32 = 1;
pub const RIGHT_EYE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u32);

impl LayerMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn only(layer: u32) -> Self {
        Self(1 << layer)
    }

    #[must_use]
    pub const fn with(self, layer: u32) -> Self {
        Self(self.0 | (1 << layer))
    }

    pub const fn contains(self, layer: u32) -> bool {
        self.0 & (1 << layer) != 0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::only(FALLBACK)
    }
}
