//! Input state tracking for map navigation.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every frame the key is
//!   down. Used for keyboard panning and rotation.
//!
//! - **Edge-triggered (just_pressed):** true only during the frame the key
//!   went down, cleared by `end_frame()`. Used for toggles (overlay, churn
//!   pause).
//!
//! Mouse drag and wheel deltas accumulate between frames and are drained by
//! `take_drag()` / `take_scroll()` so no motion is lost when several cursor
//! events arrive before the next redraw.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    F3,
    W,
    A,
    S,
    D,
    Q,
    E,
    P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    mouse_held: HashSet<MouseBtn>,

    pub mouse_position: (f64, f64),
    drag_delta: (f64, f64),
    scroll_delta: f64,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_position: (0.0, 0.0),
            drag_delta: (0.0, 0.0),
            scroll_delta: 0.0,
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        self.mouse_held.insert(btn);
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        self.mouse_held.remove(&btn);
    }

    /// Records a cursor move; motion while the left button is held counts as
    /// a drag.
    pub fn cursor_moved(&mut self, position: (f64, f64)) {
        if self.is_mouse_held(MouseBtn::Left) {
            self.drag_delta.0 += position.0 - self.mouse_position.0;
            self.drag_delta.1 += position.1 - self.mouse_position.1;
        }
        self.mouse_position = position;
    }

    /// Wheel input in notches; positive scrolls away from the user (zoom in).
    pub fn scroll(&mut self, notches: f64) {
        self.scroll_delta += notches;
    }

    pub fn take_drag(&mut self) -> (f64, f64) {
        std::mem::take(&mut self.drag_delta)
    }

    pub fn take_scroll(&mut self) -> f64 {
        std::mem::take(&mut self.scroll_delta)
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    /// Any navigation key held; the host keeps redrawing while this is true.
    pub fn is_navigating(&self) -> bool {
        const NAV_KEYS: [Key; 10] = [
            Key::Left,
            Key::Right,
            Key::Up,
            Key::Down,
            Key::W,
            Key::A,
            Key::S,
            Key::D,
            Key::Q,
            Key::E,
        ];
        NAV_KEYS.iter().any(|key| self.held.contains(key))
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        assert!(input.is_held(Key::A));
        assert!(input.is_just_pressed(Key::A));
    }

    #[test]
    fn test_key_up_clears_held() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        input.key_up(Key::A);
        assert!(!input.is_held(Key::A));
    }

    #[test]
    fn test_repeat_key_down_is_not_a_new_press() {
        let mut input = InputState::new();
        input.key_down(Key::P);
        input.end_frame();
        input.key_down(Key::P);
        assert!(!input.is_just_pressed(Key::P));
    }

    #[test]
    fn test_end_frame_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::F3);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Left));
        assert!(!input.is_just_pressed(Key::F3));
        assert!(input.is_held(Key::Left));
        assert!(input.is_held(Key::F3));
    }

    #[test]
    fn test_mouse_release_ends_drag() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Left);
        assert!(input.is_mouse_held(MouseBtn::Left));
        input.mouse_up(MouseBtn::Left);
        input.cursor_moved((40.0, 40.0));
        assert!(!input.is_mouse_held(MouseBtn::Left));
        assert_eq!(input.take_drag(), (0.0, 0.0));
    }

    #[test]
    fn test_cursor_motion_without_button_is_not_a_drag() {
        let mut input = InputState::new();
        input.cursor_moved((10.0, 10.0));
        input.cursor_moved((30.0, 5.0));
        assert_eq!(input.take_drag(), (0.0, 0.0));
        assert_eq!(input.mouse_position, (30.0, 5.0));
    }

    #[test]
    fn test_drag_accumulates_until_taken() {
        let mut input = InputState::new();
        input.cursor_moved((100.0, 100.0));
        input.mouse_down(MouseBtn::Left);
        input.cursor_moved((110.0, 95.0));
        input.cursor_moved((125.0, 90.0));
        assert_eq!(input.take_drag(), (25.0, -10.0));
        assert_eq!(input.take_drag(), (0.0, 0.0));
    }

    #[test]
    fn test_scroll_accumulates_until_taken() {
        let mut input = InputState::new();
        input.scroll(1.0);
        input.scroll(0.5);
        assert!((input.take_scroll() - 1.5).abs() < f64::EPSILON);
        assert_eq!(input.take_scroll(), 0.0);
    }

    #[test]
    fn test_navigation_keys_report_navigating() {
        let mut input = InputState::new();
        input.key_down(Key::P);
        assert!(!input.is_navigating());
        input.key_down(Key::Q);
        assert!(input.is_navigating());
        input.key_up(Key::Q);
        assert!(!input.is_navigating());
    }
}
