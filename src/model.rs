//! The canonical controller model: fixed button/axis enumerations and their
//! per-gamepad state, independent of any platform backend.

use std::fmt;

/// Number of valid (non-`Unknown`) [`Button`] variants.
pub const BUTTON_COUNT: usize = 28;
/// Number of valid (non-`Unknown`) [`Axis`] variants.
pub const AXIS_COUNT: usize = 27;

/// A canonical, platform-independent button identifier.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Button {
    South = 0,
    East = 1,
    West = 2,
    North = 3,
    Back = 4,
    Guide = 5,
    Start = 6,
    LeftStick = 7,
    RightStick = 8,
    LeftShoulder = 9,
    RightShoulder = 10,
    DpadLeft = 11,
    DpadRight = 12,
    DpadUp = 13,
    DpadDown = 14,
    LeftTrigger = 15,
    RightTrigger = 16,
    Misc1 = 17,
    RightPaddle1 = 18,
    LeftPaddle1 = 19,
    RightPaddle2 = 20,
    LeftPaddle2 = 21,
    Touchpad = 22,
    Misc2 = 23,
    Misc3 = 24,
    Misc4 = 25,
    Misc5 = 26,
    Misc6 = 27,
    Unknown = -1,
}

impl Button {
    /// All valid (non-`Unknown`) variants, in discriminant order.
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::South,
        Button::East,
        Button::West,
        Button::North,
        Button::Back,
        Button::Guide,
        Button::Start,
        Button::LeftStick,
        Button::RightStick,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::DpadLeft,
        Button::DpadRight,
        Button::DpadUp,
        Button::DpadDown,
        Button::LeftTrigger,
        Button::RightTrigger,
        Button::Misc1,
        Button::RightPaddle1,
        Button::LeftPaddle1,
        Button::RightPaddle2,
        Button::LeftPaddle2,
        Button::Touchpad,
        Button::Misc2,
        Button::Misc3,
        Button::Misc4,
        Button::Misc5,
        Button::Misc6,
    ];

    /// Index into a `[T; BUTTON_COUNT]` state array, or `None` for `Unknown`.
    pub fn index(self) -> Option<usize> {
        if self == Button::Unknown {
            None
        } else {
            Some(self as i8 as usize)
        }
    }

    /// Reverse of [`Button::index`]; panics on an index outside `0..BUTTON_COUNT`.
    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx]
    }

    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            Button::DpadLeft | Button::DpadRight | Button::DpadUp | Button::DpadDown
        )
    }

    pub fn is_trigger_shadow(self) -> bool {
        matches!(self, Button::LeftTrigger | Button::RightTrigger)
    }

    /// Fixed, human-readable label, e.g. `"South Button"`.
    pub fn name(self) -> &'static str {
        match self {
            Button::South => "South Button",
            Button::East => "East Button",
            Button::West => "West Button",
            Button::North => "North Button",
            Button::Back => "Back Button",
            Button::Guide => "Guide Button",
            Button::Start => "Start Button",
            Button::LeftStick => "Left Stick Button",
            Button::RightStick => "Right Stick Button",
            Button::LeftShoulder => "Left Shoulder Button",
            Button::RightShoulder => "Right Shoulder Button",
            Button::DpadLeft => "D-Pad Left",
            Button::DpadRight => "D-Pad Right",
            Button::DpadUp => "D-Pad Up",
            Button::DpadDown => "D-Pad Down",
            Button::LeftTrigger => "Left Trigger Button",
            Button::RightTrigger => "Right Trigger Button",
            Button::Misc1 => "Misc Button 1",
            Button::RightPaddle1 => "Right Paddle 1",
            Button::LeftPaddle1 => "Left Paddle 1",
            Button::RightPaddle2 => "Right Paddle 2",
            Button::LeftPaddle2 => "Left Paddle 2",
            Button::Touchpad => "Touchpad Button",
            Button::Misc2 => "Misc Button 2",
            Button::Misc3 => "Misc Button 3",
            Button::Misc4 => "Misc Button 4",
            Button::Misc5 => "Misc Button 5",
            Button::Misc6 => "Misc Button 6",
            Button::Unknown => "Unknown Button",
        }
    }
}

impl Default for Button {
    fn default() -> Self {
        Button::Unknown
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A canonical, platform-independent analog axis identifier.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    LeftX = 0,
    LeftY = 1,
    RightX = 2,
    RightY = 3,
    LeftTrigger = 4,
    RightTrigger = 5,
    HatDpadLeftRight = 6,
    HatDpadUpDown = 7,
    Throttle = 8,
    Rudder = 9,
    Wheel = 10,
    Gas = 11,
    Brake = 12,
    Hat1X = 13,
    Hat1Y = 14,
    Hat2X = 15,
    Hat2Y = 16,
    Hat3X = 17,
    Hat3Y = 18,
    Pressure = 19,
    Distance = 20,
    TiltX = 21,
    TiltY = 22,
    ToolWidth = 23,
    Volume = 24,
    Profile = 25,
    Misc = 26,
    Unknown = -1,
}

impl Axis {
    pub const ALL: [Axis; AXIS_COUNT] = [
        Axis::LeftX,
        Axis::LeftY,
        Axis::RightX,
        Axis::RightY,
        Axis::LeftTrigger,
        Axis::RightTrigger,
        Axis::HatDpadLeftRight,
        Axis::HatDpadUpDown,
        Axis::Throttle,
        Axis::Rudder,
        Axis::Wheel,
        Axis::Gas,
        Axis::Brake,
        Axis::Hat1X,
        Axis::Hat1Y,
        Axis::Hat2X,
        Axis::Hat2Y,
        Axis::Hat3X,
        Axis::Hat3Y,
        Axis::Pressure,
        Axis::Distance,
        Axis::TiltX,
        Axis::TiltY,
        Axis::ToolWidth,
        Axis::Volume,
        Axis::Profile,
        Axis::Misc,
    ];

    pub fn index(self) -> Option<usize> {
        if self == Axis::Unknown {
            None
        } else {
            Some(self as i8 as usize)
        }
    }

    pub fn from_index(idx: usize) -> Self {
        Self::ALL[idx]
    }

    pub fn is_stick(self) -> bool {
        matches!(self, Axis::LeftX | Axis::LeftY | Axis::RightX | Axis::RightY)
    }

    pub fn is_hat(self) -> bool {
        matches!(self, Axis::HatDpadLeftRight | Axis::HatDpadUpDown)
    }

    pub fn is_trigger(self) -> bool {
        matches!(self, Axis::LeftTrigger | Axis::RightTrigger)
    }

    /// Default deadzone for a freshly discovered axis of this kind, before a
    /// backend overrides it with device-reported data (§4.4.1: "Non-dpad/
    /// trigger axes get default deadzone 0.15; dpad hat axes get 0" — a
    /// trigger's analog range already rests at its zero end when released,
    /// so a mid-travel dead band would just cut a chunk out of its usable
    /// range rather than suppressing stick drift).
    pub fn default_deadzone(self) -> f32 {
        if self.is_hat() || self.is_trigger() {
            0.0
        } else {
            0.15
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::LeftX => "Left Stick X",
            Axis::LeftY => "Left Stick Y",
            Axis::RightX => "Right Stick X",
            Axis::RightY => "Right Stick Y",
            Axis::LeftTrigger => "Left Trigger Axis",
            Axis::RightTrigger => "Right Trigger Axis",
            Axis::HatDpadLeftRight => "D-Pad Left/Right",
            Axis::HatDpadUpDown => "D-Pad Up/Down",
            Axis::Throttle => "Throttle",
            Axis::Rudder => "Rudder",
            Axis::Wheel => "Wheel",
            Axis::Gas => "Gas",
            Axis::Brake => "Brake",
            Axis::Hat1X => "Hat 1 X",
            Axis::Hat1Y => "Hat 1 Y",
            Axis::Hat2X => "Hat 2 X",
            Axis::Hat2Y => "Hat 2 Y",
            Axis::Hat3X => "Hat 3 X",
            Axis::Hat3Y => "Hat 3 Y",
            Axis::Pressure => "Pressure",
            Axis::Distance => "Distance",
            Axis::TiltX => "Tilt X",
            Axis::TiltY => "Tilt Y",
            Axis::ToolWidth => "Tool Width",
            Axis::Volume => "Volume",
            Axis::Profile => "Profile",
            Axis::Misc => "Misc Axis",
            Axis::Unknown => "Unknown Axis",
        }
    }
}

impl Default for Axis {
    fn default() -> Self {
        Axis::Unknown
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-button state: §3.2.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ButtonState {
    pub supported: bool,
    pub current: bool,
    pub previous: bool,
}

impl ButtonState {
    pub fn is_pressed(&self) -> bool {
        self.current
    }

    pub fn is_released(&self) -> bool {
        self.previous && !self.current
    }

    pub fn is_down(&self) -> bool {
        self.previous && self.current
    }

    /// Shift `current` into `previous`, then commit `new`. Called once per
    /// dispatched change (§3.2 invariant), not once per poll.
    pub(crate) fn commit(&mut self, new: bool) {
        self.previous = self.current;
        self.current = new;
    }
}

/// Per-axis state: §3.2.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisState {
    pub supported: bool,
    pub value: f32,
    pub deadzone: f32,
}

impl Default for AxisState {
    fn default() -> Self {
        AxisState {
            supported: false,
            value: 0.0,
            deadzone: 0.0,
        }
    }
}

impl AxisState {
    pub(crate) fn commit(&mut self, new: f32) {
        self.value = new;
    }
}

/// Applies a simple magnitude deadzone to a raw normalized axis value: values
/// whose absolute magnitude is below `deadzone` collapse to `0.0`, otherwise
/// the input passes through unchanged. (§3.2 invariant.)
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_index_roundtrip() {
        for b in Button::ALL {
            let idx = b.index().unwrap();
            assert_eq!(Button::from_index(idx), b);
        }
        assert_eq!(Button::Unknown.index(), None);
    }

    #[test]
    fn axis_index_roundtrip() {
        for a in Axis::ALL {
            let idx = a.index().unwrap();
            assert_eq!(Axis::from_index(idx), a);
        }
        assert_eq!(Axis::Unknown.index(), None);
    }

    #[test]
    fn button_state_edges() {
        let mut s = ButtonState::default();
        assert!(!s.is_pressed() && !s.is_released() && !s.is_down());

        s.commit(true);
        assert!(s.is_pressed());
        assert!(!s.is_released());
        assert!(!s.is_down());

        s.commit(true);
        assert!(s.is_pressed());
        assert!(!s.is_released());
        assert!(s.is_down());

        s.commit(false);
        assert!(!s.is_pressed());
        assert!(s.is_released());
        assert!(!s.is_down());
    }

    #[test]
    fn released_and_down_are_mutually_exclusive() {
        let mut s = ButtonState::default();
        for seq in [true, false, true, true, false, false] {
            s.commit(seq);
            assert!(!(s.is_released() && s.is_down()));
        }
    }

    #[test]
    fn deadzone_suppresses_small_values() {
        assert_eq!(apply_deadzone(0.1, 0.15), 0.0);
        assert_eq!(apply_deadzone(0.2, 0.15), 0.2);
        assert_eq!(apply_deadzone(0.0, 0.15), 0.0);
    }

    #[test]
    fn default_deadzone_excludes_hats_and_triggers() {
        assert_eq!(Axis::LeftTrigger.default_deadzone(), 0.0);
        assert_eq!(Axis::RightTrigger.default_deadzone(), 0.0);
        assert_eq!(Axis::HatDpadLeftRight.default_deadzone(), 0.0);
        assert_eq!(Axis::HatDpadUpDown.default_deadzone(), 0.0);
        assert_eq!(Axis::LeftX.default_deadzone(), 0.15);
    }
}
