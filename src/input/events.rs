use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Input events the controller understands. Positions are pixels relative
/// to the map's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Button pressed; two left presses in quick succession are a double click
    PointerDown { position: Point, button: MouseButton },
    /// Pointer moved, dragging the map while the left button is held
    PointerMove { position: Point },
    PointerUp { position: Point },
    /// Pointer left the map area; ends any drag
    PointerExit,
    /// Wheel rotation, 120 per notch on most platforms, positive zooms in
    Wheel { delta: f64 },
    KeyPress { key: KeyCode },
    /// The map area changed size
    Resize { size: Point },
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Plus,
    Minus,
    Other(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize() {
        let event = InputEvent::PointerDown {
            position: Point::new(3.0, 4.0),
            button: MouseButton::Left,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: InputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
