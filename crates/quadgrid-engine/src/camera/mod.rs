//! View, projection and per-position model transforms.
//!
//! Matrices are right-handed with a `[0, 1]` clip depth range, which is what
//! wgpu expects.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Camera placement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum View {
    /// World space is used as view space unchanged.
    Identity,
    /// Camera at `eye`, looking at `target`, with `up` as the vertical hint.
    LookAt { eye: Vec3, target: Vec3, up: Vec3 },
}

impl View {
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        Self::LookAt { eye, target, up: Vec3::Y }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            View::Identity => Mat4::IDENTITY,
            View::LookAt { eye, target, up } => Mat4::look_at_rh(eye, target, up),
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::look_at(Vec3::new(9.0, 9.0, 30.0), Vec3::new(9.0, 9.0, 0.0))
    }
}

/// Projection parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    /// View space is used as clip space unchanged.
    Identity,
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, width: f32, height: f32) -> Self {
        Self::Perspective {
            fov_y_degrees,
            aspect: width / height.max(1.0),
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Identity => Mat4::IDENTITY,
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(45.0, 1024.0, 768.0)
    }
}

/// `translate(position) * scale(scale)`.
#[inline]
pub fn model_matrix(position: Vec3, scale: f32) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(scale))
}

/// Camera uniform block (`set = 0, binding = 0`).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct CameraUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(projection: Mat4, view: Mat4) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn identity_chain_passes_positions_through() {
        let m = Projection::Identity.matrix()
            * View::Identity.matrix()
            * model_matrix(Vec3::ZERO, 1.0);
        let p = Vec3::new(0.5, -0.5, 0.0);
        assert!(approx(m.transform_point3(p), p));
    }

    #[test]
    fn model_scales_then_translates() {
        let m = model_matrix(Vec3::new(4.0, 2.0, 0.0), 0.2);
        let corner = m.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!(approx(corner, Vec3::new(4.1, 2.1, 0.0)));
    }

    #[test]
    fn look_at_moves_target_onto_negative_z_axis() {
        let view = View::default();
        let View::LookAt { eye, target, .. } = view else { panic!("expected look-at") };
        let t = view.matrix().transform_point3(target);
        assert!(approx(t, Vec3::new(0.0, 0.0, -(eye - target).length())));
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth_range() {
        let proj = Projection::default().matrix();
        let near = proj.project_point3(Vec3::new(0.0, 0.0, -0.1));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, -100.0));
        assert!((near.z - 0.0).abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn default_camera_sees_whole_default_grid() {
        let clip = Projection::default().matrix() * View::default().matrix();
        for corner in [Vec3::ZERO, Vec3::new(18.0, 0.0, 0.0), Vec3::new(18.0, 18.0, 0.0)] {
            let ndc = clip.project_point3(corner);
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{corner} -> {ndc}");
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn camera_uniform_is_two_matrices() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);
    }
}
