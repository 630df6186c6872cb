//! Input events routed through the element tree.
//!
//! The windowing backend translates its native events into [`InputEvent`]s
//! and feeds them to the root once per frame.

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button (scroll wheel click).
    Middle,
}

/// Keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape key.
    Escape,
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Backspace key.
    Backspace,
    /// Space bar.
    Space,
    /// Arrow keys.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Any printable character.
    Char(char),
}

/// A single input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A mouse button went down at a position.
    MouseDown {
        /// Button pressed.
        button: MouseButton,
        /// X position in root coordinates.
        x: i32,
        /// Y position in root coordinates.
        y: i32,
    },
    /// A mouse button was released at a position.
    MouseUp {
        /// Button released.
        button: MouseButton,
        /// X position in root coordinates.
        x: i32,
        /// Y position in root coordinates.
        y: i32,
    },
    /// The pointer moved.
    MouseMotion {
        /// X position in root coordinates.
        x: i32,
        /// Y position in root coordinates.
        y: i32,
    },
    /// A key was pressed.
    KeyDown {
        /// Key pressed.
        key: Key,
    },
    /// The window was asked to close.
    Quit,
    /// Synthetic event fired by the tree itself (e.g. blur on deactivation).
    User,
}

impl InputEvent {
    /// Pointer position carried by the event, if any.
    #[must_use]
    pub const fn position(&self) -> Option<(i32, i32)> {
        match *self {
            Self::MouseDown { x, y, .. } | Self::MouseUp { x, y, .. } | Self::MouseMotion { x, y } => {
                Some((x, y))
            }
            Self::KeyDown { .. } | Self::Quit | Self::User => None,
        }
    }

    /// Left-button press at `(x, y)`.
    #[must_use]
    pub const fn click(x: i32, y: i32) -> Self {
        Self::MouseDown {
            button: MouseButton::Left,
            x,
            y,
        }
    }
}
