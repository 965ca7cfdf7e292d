use glam::{Mat4, Vec3, Vec4};

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
/// Half-height of the near plane; the half-width is this times the aspect.
pub const FRUSTUM_HALF_HEIGHT: f32 = 0.1;

/// Remaps OpenGL clip depth (`-w..w`) onto the `0..w` range wgpu expects.
pub const GL_TO_WGPU_DEPTH: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 0.0),
    Vec4::new(0.0, 0.0, 0.5, 1.0),
);

/// OpenGL-style perspective frustum (`glFrustum` semantics).
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let width = right - left;
    let height = top - bottom;
    let depth = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 * near / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / height, 0.0, 0.0),
        Vec4::new(
            (right + left) / width,
            (top + bottom) / height,
            -(far + near) / depth,
            -1.0,
        ),
        Vec4::new(0.0, 0.0, -2.0 * far * near / depth, 0.0),
    )
}

/// Projection for a surface of `width x height` pixels, in wgpu clip space.
pub fn surface_projection(width: u32, height: u32) -> Mat4 {
    let ratio = FRUSTUM_HALF_HEIGHT * width.max(1) as f32 / height.max(1) as f32;
    GL_TO_WGPU_DEPTH
        * frustum(
            -ratio,
            ratio,
            -FRUSTUM_HALF_HEIGHT,
            FRUSTUM_HALF_HEIGHT,
            NEAR_PLANE,
            FAR_PLANE,
        )
}

/// Camera one unit in front of the origin, looking down -Z with -Y as up.
pub fn view_matrix() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0))
}

/// `projection * view * rotation(theta about Z)`.
pub fn line_transform(projection: Mat4, theta_degrees: f32) -> Mat4 {
    projection * view_matrix() * Mat4::from_rotation_z(theta_degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ndc(m: Mat4, point: Vec3) -> Vec3 {
        let clip = m * point.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn frustum_scales_by_aspect() {
        let projection = surface_projection(200, 100);
        assert!((projection.x_axis.x - 0.5).abs() < 1e-6);
        assert!((projection.y_axis.y - 1.0).abs() < 1e-6);
        assert_eq!(projection.z_axis.w, -1.0);
    }

    #[test]
    fn near_and_far_map_to_wgpu_depth_range() {
        let projection = surface_projection(100, 100);
        let near = ndc(projection, Vec3::new(0.0, 0.0, -NEAR_PLANE));
        let far = ndc(projection, Vec3::new(0.0, 0.0, -FAR_PLANE));
        assert!(near.z.abs() < 1e-5, "near depth {}", near.z);
        assert!((far.z - 1.0).abs() < 1e-4, "far depth {}", far.z);
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let m = line_transform(surface_projection(1080, 1920), 37.0);
        let centre = ndc(m, Vec3::ZERO);
        assert!(centre.x.abs() < 1e-6);
        assert!(centre.y.abs() < 1e-6);
        assert!((0.0..1.0).contains(&centre.z));
    }

    #[test]
    fn view_up_is_negative_y() {
        let view = view_matrix();
        let up = view.transform_vector3(Vec3::new(0.0, -1.0, 0.0));
        assert!((up - Vec3::Y).length() < 1e-6);
        let right = view.transform_vector3(Vec3::new(-1.0, 0.0, 0.0));
        assert!((right - Vec3::X).length() < 1e-6);
        let eye = view.transform_point3(Vec3::ZERO);
        assert!((eye - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn half_turn_mirrors_points() {
        let projection = surface_projection(100, 100);
        let point = Vec3::new(0.3, 0.2, 0.5);
        let a = ndc(line_transform(projection, 0.0), point);
        let b = ndc(line_transform(projection, 180.0), point);
        assert!((a.x + b.x).abs() < 1e-5);
        assert!((a.y + b.y).abs() < 1e-5);
    }
}
