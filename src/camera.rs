//! Free-look fly camera: mouse deltas steer yaw/pitch, arrow keys move
//! along the view direction and right vector. Produces the view and
//! projection matrices consumed by the frame renderer.

use glam::{Mat4, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

const MOVE_SPEED: f32 = 3.0;
const MOUSE_SPEED: f32 = 0.005;
const FOV_Y_RADIANS: f32 = PI / 4.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;
// Keep pitch just shy of straight up/down so the up vector stays defined.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Movement and look input for one frame. Mouse deltas are pixels since the
/// previous frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraInput {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}

pub struct Camera {
    position: Vec3,
    horizontal_angle: f32,
    vertical_angle: f32,
}

impl Default for Camera {
    fn default() -> Self {
        // Start behind the origin facing -Z, level with the horizon.
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            horizontal_angle: PI,
            vertical_angle: 0.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, input: &CameraInput, dt: f32) {
        self.horizontal_angle -= MOUSE_SPEED * input.mouse_dx;
        self.vertical_angle =
            (self.vertical_angle - MOUSE_SPEED * input.mouse_dy).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let direction = self.direction();
        let right = self.right();
        let step = MOVE_SPEED * dt;
        if input.forward {
            self.position += direction * step;
        }
        if input.backward {
            self.position -= direction * step;
        }
        if input.strafe_right {
            self.position += right * step;
        }
        if input.strafe_left {
            self.position -= right * step;
        }
    }

    /// Spherical-to-cartesian view direction.
    pub fn direction(&self) -> Vec3 {
        Vec3::new(
            self.vertical_angle.cos() * self.horizontal_angle.sin(),
            self.vertical_angle.sin(),
            self.vertical_angle.cos() * self.horizontal_angle.cos(),
        )
    }

    fn right(&self) -> Vec3 {
        Vec3::new(
            (self.horizontal_angle - FRAC_PI_2).sin(),
            0.0,
            (self.horizontal_angle - FRAC_PI_2).cos(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        let direction = self.direction();
        let up = self.right().cross(direction);
        Mat4::look_to_rh(self.position, direction, up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(FOV_Y_RADIANS, aspect, NEAR_PLANE, FAR_PLANE)
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, CameraInput};
    use glam::{Vec3, Vec4};

    #[test]
    fn default_camera_faces_negative_z() {
        let camera = Camera::new();
        let direction = camera.direction();
        assert!(direction.abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-6), "{direction}");
    }

    #[test]
    fn a_point_ahead_lands_in_front_of_the_view() {
        let camera = Camera::new();
        let view = camera.view_matrix();
        // World origin is 5 units ahead of the default eye.
        let in_view = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((in_view.z + 5.0).abs() < 1e-5, "expected z -5, got {}", in_view.z);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut camera = Camera::new();
        let input = CameraInput {
            mouse_dy: -1.0e6,
            ..CameraInput::default()
        };
        camera.update(&input, 0.016);
        let direction = camera.direction();
        assert!(direction.y < 1.0, "pitch must not reach straight up");
        assert!(direction.y > 0.99, "large upward look should approach the clamp");
    }

    #[test]
    fn forward_movement_follows_the_view_direction() {
        let mut camera = Camera::new();
        let before = camera.position;
        let input = CameraInput {
            forward: true,
            ..CameraInput::default()
        };
        camera.update(&input, 1.0);
        let moved = camera.position - before;
        assert!(moved.z < 0.0, "default forward is -Z, moved {moved}");
        assert!((moved.length() - 3.0).abs() < 1e-4, "one second at move speed");
    }

    #[test]
    fn projection_is_finite_for_degenerate_aspect() {
        let camera = Camera::new();
        let projection = camera.projection_matrix(1.0);
        assert!(projection.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
