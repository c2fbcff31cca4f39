use glam::{Mat4, Vec3};
use orrery_engine::input::{InputFrame, InputState, Key, MouseButton};
use orrery_engine::render::PostSettings;

/// Camera translation per W/S/A/D press or key repeat, in world units.
pub const MOVE_STEP: f32 = 0.2;
/// Camera rotation per logical pixel of left-button drag.
pub const DRAG_DEGREES_PER_PIXEL: f32 = 0.1;

/// Runtime switches flipped from the keyboard.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Toggles {
    pub rotating: bool,
    pub toon: bool,
    pub post: PostSettings,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            rotating: true,
            toon: false,
            post: PostSettings::default(),
        }
    }
}

impl Toggles {
    /// Flips every switch whose key went down this frame. Repeats are ignored.
    pub fn apply(&mut self, frame: &InputFrame) {
        let pressed = |key| frame.keys_pressed.contains(&key);

        if pressed(Key::Space) {
            self.rotating = !self.rotating;
            log::info!("orbit rotation: {}", on_off(self.rotating));
        }
        if pressed(Key::Digit1) {
            self.toon = !self.toon;
            log::info!("toon shading: {}", on_off(self.toon));
        }
        if pressed(Key::Digit7) {
            self.post.grayscale = !self.post.grayscale;
            log::info!("grayscale: {}", on_off(self.post.grayscale));
        }
        if pressed(Key::Digit8) {
            self.post.horizontal_mirror = !self.post.horizontal_mirror;
            log::info!("horizontal mirror: {}", on_off(self.post.horizontal_mirror));
        }
        if pressed(Key::Digit9) {
            self.post.vertical_mirror = !self.post.vertical_mirror;
            log::info!("vertical mirror: {}", on_off(self.post.vertical_mirror));
        }
        if pressed(Key::Digit0) {
            self.post.blur = !self.post.blur;
            log::info!("blur: {}", on_off(self.post.blur));
        }
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

pub fn exit_requested(frame: &InputFrame) -> bool {
    frame.keys_pressed.contains(&Key::Escape)
}

/// Camera movement for this frame, expressed in the camera's local frame.
///
/// Post-multiply onto the camera's local transform. Identity when idle.
pub fn camera_delta(frame: &InputFrame, input: &InputState) -> Mat4 {
    let mut step = Vec3::ZERO;
    for (key, dir) in [
        (Key::W, Vec3::NEG_Z),
        (Key::S, Vec3::Z),
        (Key::A, Vec3::NEG_X),
        (Key::D, Vec3::X),
    ] {
        if frame.key_triggered(key) {
            step += dir * MOVE_STEP;
        }
    }

    let mut delta = Mat4::from_translation(step);

    let (dx, dy) = frame.pointer_delta;
    if input.button_down(MouseButton::Left) && (dx != 0.0 || dy != 0.0) {
        let yaw = (dx * DRAG_DEGREES_PER_PIXEL).to_radians();
        let pitch = (dy * DRAG_DEGREES_PER_PIXEL).to_radians();
        delta = delta * Mat4::from_rotation_y(-yaw) * Mat4::from_rotation_x(-pitch);
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_engine::input::{
        InputEvent, Modifiers, MouseButtonState, PointerButtonEvent, PointerMoveEvent,
    };

    fn frame_with(keys: &[Key]) -> InputFrame {
        let mut frame = InputFrame::default();
        frame.keys_pressed.extend(keys.iter().copied());
        frame
    }

    fn left_drag(from: (f32, f32), to: (f32, f32)) -> (InputState, InputFrame) {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::PointerMoved(PointerMoveEvent { x: from.0, y: from.1 }),
        );
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state: MouseButtonState::Pressed,
                x: from.0,
                y: from.1,
                modifiers: Modifiers::default(),
            }),
        );
        state.apply_event(
            &mut frame,
            InputEvent::PointerMoved(PointerMoveEvent { x: to.0, y: to.1 }),
        );
        (state, frame)
    }

    // ── toggles ─────────────────────────────────────────────────────────────

    #[test]
    fn keys_flip_their_switch() {
        let mut t = Toggles::default();
        t.apply(&frame_with(&[Key::Space, Key::Digit1, Key::Digit0]));
        assert!(!t.rotating);
        assert!(t.toon);
        assert!(t.post.blur);
        assert!(!t.post.grayscale);

        t.apply(&frame_with(&[Key::Digit7, Key::Digit8, Key::Digit9, Key::Space]));
        assert!(t.rotating);
        assert!(t.post.grayscale && t.post.horizontal_mirror && t.post.vertical_mirror);
    }

    #[test]
    fn repeats_do_not_toggle() {
        let mut t = Toggles::default();
        let mut frame = InputFrame::default();
        frame.keys_repeated.insert(Key::Space);
        t.apply(&frame);
        assert_eq!(t, Toggles::default());
    }

    #[test]
    fn escape_exits() {
        assert!(exit_requested(&frame_with(&[Key::Escape])));
        assert!(!exit_requested(&frame_with(&[Key::Q])));
    }

    // ── camera ──────────────────────────────────────────────────────────────

    #[test]
    fn idle_frame_leaves_camera() {
        let delta = camera_delta(&InputFrame::default(), &InputState::default());
        assert_eq!(delta, Mat4::IDENTITY);
    }

    #[test]
    fn wasd_moves_along_local_axes() {
        let forward = camera_delta(&frame_with(&[Key::W]), &InputState::default());
        assert!(forward
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -MOVE_STEP), 1e-6));

        let mut repeat = InputFrame::default();
        repeat.keys_repeated.insert(Key::D);
        let right = camera_delta(&repeat, &InputState::default());
        assert!(right
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(MOVE_STEP, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn camera_moves_in_its_own_frame() {
        // Camera turned 90° to the left: "forward" is world -X.
        let camera = Mat4::from_rotation_y(90f32.to_radians());
        let moved = camera * camera_delta(&frame_with(&[Key::W]), &InputState::default());
        assert!(moved
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(-MOVE_STEP, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn left_drag_rotates() {
        let (state, frame) = left_drag((100.0, 100.0), (110.0, 100.0));
        let delta = camera_delta(&frame, &state);
        let expected = Mat4::from_rotation_y(-(1.0f32).to_radians());
        assert!(delta.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn hover_without_button_does_not_rotate() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        for x in [0.0, 50.0] {
            state.apply_event(
                &mut frame,
                InputEvent::PointerMoved(PointerMoveEvent { x, y: 0.0 }),
            );
        }
        assert_eq!(frame.pointer_delta, (50.0, 0.0));
        assert_eq!(camera_delta(&frame, &state), Mat4::IDENTITY);
    }
}
