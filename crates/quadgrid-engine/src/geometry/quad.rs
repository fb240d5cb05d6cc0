use bytemuck::{Pod, Zeroable};

/// Object-space vertex position.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
}

impl Vertex {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }

    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub const QUAD_VERTEX_COUNT: usize = 6;

/// Unit quad centred on the origin, two triangles, no index buffer.
pub const QUAD_VERTICES: [Vertex; QUAD_VERTEX_COUNT] = [
    Vertex::new(0.5, 0.5, 0.0),
    Vertex::new(0.5, -0.5, 0.0),
    Vertex::new(-0.5, 0.5, 0.0),
    Vertex::new(-0.5, 0.5, 0.0),
    Vertex::new(-0.5, -0.5, 0.0),
    Vertex::new(0.5, -0.5, 0.0),
];
