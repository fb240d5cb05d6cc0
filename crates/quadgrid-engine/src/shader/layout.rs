/// A uniform block the renderer binds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
    /// Bytes the renderer binds; a block declared larger cannot be bound.
    pub size: u32,
}

/// `projection` and `view`, two column-major `mat4`s.
pub const CAMERA_SLOT: UniformSlot = UniformSlot {
    group: 0,
    binding: 0,
    size: 128,
};

/// One `mat4` per draw, selected by dynamic offset.
pub const MODEL_SLOT: UniformSlot = UniformSlot {
    group: 1,
    binding: 0,
    size: 64,
};

/// Every uniform block a program may declare.
pub const UNIFORM_SLOTS: [UniformSlot; 2] = [CAMERA_SLOT, MODEL_SLOT];

/// The only vertex attribute the mesh provides (`Float32x3` position).
pub const POSITION_LOCATION: u32 = 0;

/// The only colour target a frame has.
pub const COLOR_LOCATION: u32 = 0;

pub(crate) fn uniform_slot(group: u32, binding: u32) -> Option<UniformSlot> {
    UNIFORM_SLOTS
        .into_iter()
        .find(|s| s.group == group && s.binding == binding)
}
