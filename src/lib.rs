//! Cross-platform gamepad discovery, polling, and SDL-mapping normalization.
//!
//! `gamepads` presents one canonical button/axis model over four dissimilar
//! OS input stacks (Linux evdev, Windows XInput+DirectInput, macOS IOKit
//! HID, and a `wasm32` browser gamepad backend). An application owns a
//! single [`Gamepads`] container, polls it once per frame, and reads state
//! back either directly off a [`Gamepad`] or through the queued event API.
//!
//! ```no_run
//! use gamepads::{Gamepads, Button};
//!
//! let mut gamepads = Gamepads::new();
//! loop {
//!     gamepads.poll();
//!     for gamepad in gamepads.iter() {
//!         if gamepad.button_is_pressed(Button::South) {
//!             println!("{} pressed South", gamepad.name());
//!         }
//!     }
//!     # break;
//! }
//! ```

mod error;
mod event;
mod gamepad;
mod mapping;
mod model;
mod platform;

pub use error::{MappingError, PlatformError};
pub use event::{AxisMoveFn, ConnectFn, DisconnectFn, Event, EventType, GamepadId, PressFn, ReleaseFn};
pub use gamepad::{Gamepad, MappingSource};
pub use model::{Axis, AxisState, Button, ButtonState, AXIS_COUNT, BUTTON_COUNT};

/// Default maximum number of simultaneously connected gamepads (§3.4).
pub const MAX_GAMEPADS: usize = 4;
/// Default maximum number of queued events per container (§3.6/§4.3).
pub const MAX_EVENTS: usize = 32;

/// The container type applications actually name: `N` simultaneous gamepads,
/// `E` queued events, defaulting to the spec's stated defaults (§6.1).
pub type Gamepads<const N: usize = MAX_GAMEPADS, const E: usize = MAX_EVENTS> =
    gamepad::Gamepads<N, E>;
