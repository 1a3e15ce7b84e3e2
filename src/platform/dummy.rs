//! Fallback backend for targets that are none of Linux, Windows, macOS, or
//! `wasm32`. Per §7's failure taxonomy ("backend fails to initialize... no
//! driver library found" is tolerated, not fatal): this backend always
//! finds zero devices, so callers compile and run, they just never see a
//! gamepad connect.

use log::warn;

use crate::gamepad::{Gamepad, Gamepads};
use crate::model::{Axis, Button};
use crate::platform::PlatformBackend;

#[derive(Debug, Default)]
pub struct Substate;

#[derive(Default)]
pub struct DummyBackend;

impl PlatformBackend for DummyBackend {
    fn init_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        warn!("no gamepad backend is available for this target; discovery is disabled");
        container.record_platform_error(crate::error::PlatformError::new(
            "no gamepad backend is available for this target",
        ));
    }

    fn free_platform(&mut self) {}

    fn poll_platform<const N: usize, const E: usize>(&mut self, _container: &mut Gamepads<N, E>) -> bool {
        false
    }

    fn update_platform<const N: usize, const E: usize>(
        &mut self,
        _container: &mut Gamepads<N, E>,
        _index: usize,
    ) -> bool {
        false
    }

    fn release_platform(&mut self, _gamepad: &mut Gamepad) {}

    fn get_button_platform(&self, _native_code: u32) -> Button {
        Button::Unknown
    }

    fn get_axis_platform(&self, _native_code: u32) -> Axis {
        Axis::Unknown
    }
}
