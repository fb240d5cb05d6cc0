/// Vertex stage: positions go through projection, view and a per-draw model matrix.
pub const DEFAULT_VERTEX_SOURCE: &str = r#"#version 450

layout(location = 0) in vec3 a_pos;

layout(set = 0, binding = 0) uniform Camera {
    mat4 projection;
    mat4 view;
} camera;

layout(set = 1, binding = 0) uniform Model {
    mat4 model;
} per_draw;

void main() {
    gl_Position = camera.projection * camera.view * per_draw.model * vec4(a_pos, 1.0);
}
"#;

/// Fragment stage: flat orange.
pub const DEFAULT_FRAGMENT_SOURCE: &str = r#"#version 450

layout(location = 0) out vec4 frag_color;

void main() {
    frag_color = vec4(1.0, 0.5, 0.2, 1.0);
}
"#;

/// GLSL source text for both stages of a program.
///
/// The renderer binds the camera block at `set = 0` and the model block at
/// `set = 1` (dynamic offset); replacement sources must keep that layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::new(DEFAULT_VERTEX_SOURCE, DEFAULT_FRAGMENT_SOURCE)
    }
}
