use glam::Vec3;

use super::quad::Vertex;

/// Distance between neighbouring grid positions, in world units.
pub const GRID_SPACING: f32 = 2.0;

/// How the base quad reaches the GPU.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MeshUpload {
    /// One copy of the quad; every draw reuses it under a different model matrix.
    #[default]
    Shared,
    /// `side²` copies of the quad back to back; draw `i` reads copy `i`.
    Replicated,
}

/// Returns the `side × side` lattice of world positions.
///
/// Enumeration is row-major: `y` is the outer loop, `x` the inner one, and each
/// entry is `(GRID_SPACING * x, GRID_SPACING * y, 0)`. `side == 0` yields an
/// empty sequence.
pub fn grid_positions(side: u32) -> Vec<Vec3> {
    let mut positions = Vec::with_capacity((side as usize) * (side as usize));
    for y in 0..side {
        for x in 0..side {
            positions.push(Vec3::new(
                GRID_SPACING * x as f32,
                GRID_SPACING * y as f32,
                0.0,
            ));
        }
    }
    positions
}

/// Concatenates `copies` copies of `base` into one flat buffer.
pub fn replicate(base: &[Vertex], copies: usize) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(base.len() * copies);
    for _ in 0..copies {
        out.extend_from_slice(base);
    }
    out
}

/// Grid positions plus the mesh drawn at each of them.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    side: u32,
    positions: Vec<Vec3>,
    base: Vec<Vertex>,
}

impl GridGeometry {
    pub fn generate(side: u32, base: &[Vertex]) -> Self {
        Self {
            side,
            positions: grid_positions(side),
            base: base.to_vec(),
        }
    }

    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Vertices of one quad.
    #[inline]
    pub fn base(&self) -> &[Vertex] {
        &self.base
    }

    /// Vertex data for the given upload mode.
    ///
    /// `Replicated` returns `positions().len() * base().len()` vertices.
    pub fn vertices(&self, upload: MeshUpload) -> Vec<Vertex> {
        match upload {
            MeshUpload::Shared => self.base.clone(),
            MeshUpload::Replicated => replicate(&self.base, self.positions.len()),
        }
    }

    /// First vertex of the quad drawn for position `index`.
    #[inline]
    pub fn first_vertex(&self, upload: MeshUpload, index: usize) -> u32 {
        match upload {
            MeshUpload::Shared => 0,
            MeshUpload::Replicated => (index * self.base.len()) as u32,
        }
    }
}
