//! First-person fly camera driven by yaw/pitch angles.

use glam::{Mat4, Vec3};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;
/// Narrowest field of view reachable with the scroll wheel, in degrees.
pub const MIN_ZOOM: f32 = 1.0;
/// Widest field of view reachable with the scroll wheel, in degrees.
pub const MAX_ZOOM: f32 = 45.0;
const PITCH_LIMIT: f32 = 89.0;

/// Translation directions understood by [`Camera::process_keyboard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Points the camera along `front`, kept exactly as given until the next
    /// mouse movement. Yaw and pitch are derived from its direction.
    ///
    /// A zero vector leaves the orientation unchanged.
    pub fn look_along(&mut self, front: Vec3) {
        let Some(direction) = front.try_normalize() else {
            return;
        };
        self.pitch = direction
            .y
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = direction.z.atan2(direction.x).to_degrees();
        self.front = front;
        // Straight up or down has no cross product with world up; keep the old right.
        if let Some(right) = direction.cross(self.world_up).try_normalize() {
            self.right = right;
        }
        self.up = self.right.cross(direction).normalize();
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        let offset = match direction {
            CameraMovement::Forward => self.front,
            CameraMovement::Backward => -self.front,
            CameraMovement::Left => -self.right,
            CameraMovement::Right => self.right,
            CameraMovement::Up => self.up,
            CameraMovement::Down => -self.up,
        };
        self.position += offset * velocity;
    }

    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch =
            (self.pitch + y_offset * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front =
            Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(approx(camera.front(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10_000.0);
        assert_eq!(camera.pitch(), 89.0);
        assert!((camera.front().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn look_along_recovers_yaw_and_pitch() {
        let mut camera = Camera::default();
        let front = Vec3::new(1.0, 1.0, 0.0);
        camera.look_along(front);
        assert_eq!(camera.front(), front);
        assert!((camera.pitch() - 45.0).abs() < 1e-4);
        assert!(camera.yaw().abs() < 1e-4);
        assert!(approx(camera.right(), Vec3::Z));
    }

    #[test]
    fn look_along_keeps_the_written_front() {
        for front in [
            Vec3::new(0.6, 0.0, -0.8),
            Vec3::new(0.0, 0.0, -2.0),
            Vec3::new(0.3, -0.2, -0.9),
        ] {
            let mut camera = Camera::default();
            camera.look_along(front);
            assert_eq!(camera.front(), front);
            assert!((camera.right().length() - 1.0).abs() < 1e-5);
            assert!(camera.up().dot(front).abs() < 1e-5);
        }
    }

    #[test]
    fn mouse_movement_after_look_along_continues_from_it() {
        let mut camera = Camera::default();
        camera.look_along(Vec3::new(0.0, 0.0, -2.0));
        camera.process_mouse_movement(0.0, 0.0);
        assert!(approx(camera.front(), Vec3::NEG_Z));
    }

    #[test]
    fn looking_straight_up_keeps_a_finite_basis() {
        let mut camera = Camera::default();
        camera.look_along(Vec3::Y);
        assert_eq!(camera.front(), Vec3::Y);
        assert!(camera.right().is_finite() && camera.up().is_finite());
    }

    #[test]
    fn look_along_ignores_zero_vector() {
        let mut camera = Camera::default();
        camera.look_along(Vec3::ZERO);
        assert_eq!(camera, Camera::default());
    }

    #[test]
    fn forward_moves_along_front() {
        let mut camera = Camera::default();
        camera.process_keyboard(CameraMovement::Forward, 2.0);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, 3.0 - 5.0)));
    }
}
