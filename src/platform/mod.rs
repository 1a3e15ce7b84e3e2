//! Platform backend contract (§4.4) and per-OS implementations.
//!
//! Exactly one backend compiles in depending on target; downstream code
//! only ever names the `Backend`/`Substate` aliases this module exports,
//! never a concrete per-OS type.

use crate::gamepad::{Gamepad, Gamepads};
use crate::model::{Axis, Button};

/// The six operations a backend must implement (§4.4's contract table).
///
/// `init_platform`/`poll_platform` are handed the whole container because
/// they allocate/release gamepad slots themselves (hot-plug discovery owns
/// the registry transition, not just the raw I/O); `update_platform` and
/// `release_platform` operate on one already-registered gamepad.
///
/// The container-touching methods are generic per-call over `N`/`E` rather
/// than the trait being parameterized over them: a backend is one
/// process-wide singleton (§5), independent of which `Gamepads<N, E>`
/// instantiation it happens to serve, and this keeps `Gamepads` free to
/// vary its two capacity consts without forcing a matching const pair onto
/// every backend impl.
pub trait PlatformBackend {
    /// Open driver resources, enumerate currently-connected devices, and
    /// emit a synthetic Connect for each (via `container.handle_connect`).
    fn init_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>);

    /// Close all driver-level resources. Does not release per-gamepad
    /// state; the caller's `Gamepads::free` does that separately.
    fn free_platform(&mut self);

    /// Drain hot-plug notifications only; emits Connect/Disconnect through
    /// `container`. Returns `true` if anything was handled.
    fn poll_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) -> bool;

    /// Read pending raw input for one already-registered gamepad and emit
    /// button/axis events through `container`. Returns `true` if anything
    /// was handled.
    fn update_platform<const N: usize, const E: usize>(
        &mut self,
        container: &mut Gamepads<N, E>,
        index: usize,
    ) -> bool;

    /// Close the per-gamepad device handle.
    fn release_platform(&mut self, gamepad: &mut Gamepad);

    /// Hardcoded native-code → canonical fallback, used when the mapping
    /// DB has no entry for this device (§4.4's resolution order).
    fn get_button_platform(&self, native_code: u32) -> Button;
    fn get_axis_platform(&self, native_code: u32) -> Axis;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{LinuxBackend as Backend, Substate};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::{Substate, WindowsBackend as Backend};

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{MacosBackend as Backend, Substate};

#[cfg(target_arch = "wasm32")]
mod wasm;
#[cfg(target_arch = "wasm32")]
pub use wasm::{Substate, WasmBackend as Backend};

#[cfg(not(any(
    target_os = "linux",
    target_os = "windows",
    target_os = "macos",
    target_arch = "wasm32"
)))]
mod dummy;
#[cfg(not(any(
    target_os = "linux",
    target_os = "windows",
    target_os = "macos",
    target_arch = "wasm32"
)))]
pub use dummy::{DummyBackend as Backend, Substate};
