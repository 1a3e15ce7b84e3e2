//! Web backend: browser `navigator.getGamepads()` polling plus
//! `gamepadconnected`/`gamepaddisconnected` events (§4.4.4).
//!
//! The browser's Gamepad API only ever hands out a flat, positional
//! snapshot of all pads at once — there is no per-device raw report to
//! read, unlike evdev/XInput/HID. `update_platform` therefore re-fetches
//! the whole `getGamepads()` array every call and indexes into it by the
//! stored `browser_index`, diffing against the canonical state the same
//! way the other backends diff against their last-seen raw value.
//!
//! Hot-plug is event-driven rather than polled: `gamepadconnected`/
//! `gamepaddisconnected` fire from the browser's own event loop, not from
//! inside our `poll_platform` call, so the listeners only record the
//! browser-native index into a process-wide pending queue; `poll_platform`
//! drains that queue and does the actual container mutation. `poll_platform`
//! itself has nothing further to do beyond that drain (§9's TODO: "the
//! source's own `poll_platform` is a stub for WebAssembly hot-plug
//! polling -- everything flows through the register-callback path").

use std::cell::RefCell;
use std::collections::VecDeque;

use js_sys::RegExp;
use log::{debug, trace, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Gamepad as WebGamepad, GamepadEvent};

use crate::gamepad::{Gamepad, Gamepads};
use crate::model::{Axis, Button};
use crate::platform::PlatformBackend;

/// Positional index -> canonical button, the W3C "Standard Gamepad"
/// button layout the browser normalizes every pad into (§4.4.4).
const BUTTON_ORDER: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftShoulder,
    Button::RightShoulder,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::Back,
    Button::Start,
    Button::LeftStick,
    Button::RightStick,
    Button::DpadUp,
    Button::DpadDown,
    Button::DpadLeft,
    Button::DpadRight,
    Button::Guide,
];

/// Positional index -> canonical axis, the Standard Gamepad's four core
/// axes (§4.4.4: "first 4 axes").
const AXIS_ORDER: [Axis; 4] = [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY];

struct PendingHotplug {
    browser_index: u32,
    connected: bool,
}

thread_local! {
    /// Populated by the `gamepadconnected`/`gamepaddisconnected` listeners,
    /// drained by `poll_platform`. wasm32 is single-threaded so a
    /// `thread_local` is equivalent to the process-wide globals the other
    /// backends use (§5), without needing a raw pointer into a container
    /// that may not even exist yet when a listener first fires.
    static PENDING: RefCell<VecDeque<PendingHotplug>> = const { RefCell::new(VecDeque::new()) };
}

fn push_pending(browser_index: u32, connected: bool) {
    PENDING.with(|p| p.borrow_mut().push_back(PendingHotplug { browser_index, connected }));
}

/// Per-gamepad web state (§3.3): just the browser's own positional index,
/// since there is no persistent handle to hold onto between samples.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Substate {
    browser_index: Option<u32>,
}

#[derive(Default)]
pub struct WasmBackend {
    connected_closure: Option<Closure<dyn FnMut(JsValue)>>,
    disconnected_closure: Option<Closure<dyn FnMut(JsValue)>>,
}

/// Extracts a vendor:product pair from a browser `Gamepad.id()` string the
/// way Chrome/Firefox format it, mirroring the teacher's wasm backend's own
/// regex (`(?:^([a-f0-9]{4})-([a-f0-9]{4})-)|(?:Vendor: ([a-f0-9]{4})
/// Product: ([a-f0-9]{4})\)$)`).
fn extract_vendor_product(id: &str) -> Option<(u16, u16)> {
    let re = RegExp::new(
        r"(?:^([a-f0-9]{4})-([a-f0-9]{4})-)|(?:Vendor: ([a-f0-9]{4}) Product: ([a-f0-9]{4})\)$)",
        "",
    );
    let matches = re.exec(id)?;
    let hex = |index: u32| -> Option<u16> {
        matches.get(index).as_string().and_then(|s| u16::from_str_radix(&s, 16).ok())
    };
    let vendor = hex(1).or_else(|| hex(3))?;
    let product = hex(2).or_else(|| hex(4))?;
    Some((vendor, product))
}

/// Same little-endian byte-pair GUID layout the Linux/macOS backends use
/// (§4.4.4 cross-references §4.4.1's synthesis rule); falls back to a
/// name-seeded GUID when the id string doesn't carry a recognisable VID/PID.
fn device_guid(id: &str) -> String {
    if let Some((vendor, product)) = extract_vendor_product(id) {
        format!(
            "03000000{:02x}{:02x}0000{:02x}{:02x}0000000000000000",
            vendor as u8,
            (vendor >> 8) as u8,
            product as u8,
            (product >> 8) as u8,
        )
    } else {
        let bytes: Vec<u8> = id.bytes().take(16).collect();
        let mut padded = [0u8; 16];
        padded[..bytes.len()].copy_from_slice(&bytes);
        padded.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn fallback_button(native_code: u32) -> Button {
    BUTTON_ORDER.get(native_code as usize).copied().unwrap_or(Button::Unknown)
}

fn fallback_axis(native_code: u32) -> Axis {
    AXIS_ORDER.get(native_code as usize).copied().unwrap_or(Axis::Unknown)
}

fn resolve_button<const N: usize, const E: usize>(
    container: &Gamepads<N, E>,
    guid: &str,
    native_code: u32,
) -> Button {
    let mapped = container
        .mapping_db()
        .resolve(guid)
        .map(|m| m.translate_button(native_code.min(255) as u8))
        .unwrap_or(Button::Unknown);
    if mapped != Button::Unknown {
        mapped
    } else {
        fallback_button(native_code)
    }
}

fn resolve_axis<const N: usize, const E: usize>(container: &Gamepads<N, E>, guid: &str, native_code: u32) -> Axis {
    let mapped = container
        .mapping_db()
        .resolve(guid)
        .map(|m| m.translate_axis(native_code as usize))
        .unwrap_or(Axis::Unknown);
    if mapped != Axis::Unknown {
        mapped
    } else {
        fallback_axis(native_code)
    }
}

fn get_gamepads() -> Vec<WebGamepad> {
    let Some(window) = web_sys::window() else { return Vec::new() };
    let Ok(list) = window.navigator().get_gamepads() else {
        return Vec::new();
    };
    list.into_iter().filter_map(|v| if v.is_null() { None } else { v.dyn_into::<WebGamepad>().ok() }).collect()
}

/// Registers a newly observed browser gamepad, resolving its mapping and
/// marking the Standard Gamepad's 17 buttons / 4 axes supported.
fn register<const N: usize, const E: usize>(container: &mut Gamepads<N, E>, gamepad: &WebGamepad) {
    let id = gamepad.id();
    let guid = device_guid(&id);
    let substate = Substate { browser_index: Some(gamepad.index()) };
    let Some(idx) = container.handle_connect(guid.clone(), id, substate) else {
        debug!("web gamepad connected but container is full, ignoring");
        return;
    };
    for code in 0..BUTTON_ORDER.len() as u32 {
        let button = resolve_button(container, &guid, code);
        if button != Button::Unknown {
            container.gamepad_mut(idx).set_button_supported(button, true);
        }
    }
    for code in 0..AXIS_ORDER.len() as u32 {
        let axis = resolve_axis(container, &guid, code);
        if axis != Axis::Unknown {
            container.gamepad_mut(idx).set_axis_supported(axis, true, axis.default_deadzone());
        }
    }
    trace!("gamepad {idx}: registered web Standard Gamepad layout");
}

impl PlatformBackend for WasmBackend {
    fn init_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        let Some(window) = web_sys::window() else {
            warn!("no window object, web gamepad backend disabled");
            return;
        };
        if !window.is_secure_context() {
            warn!("page is not a secure context, Gamepad API may be unavailable");
        }

        let connected: Closure<dyn FnMut(JsValue)> = Closure::new(|event: JsValue| {
            if let Ok(event) = event.dyn_into::<GamepadEvent>() {
                push_pending(event.gamepad().map(|g| g.index()).unwrap_or(0), true);
            }
        });
        let disconnected: Closure<dyn FnMut(JsValue)> = Closure::new(|event: JsValue| {
            if let Ok(event) = event.dyn_into::<GamepadEvent>() {
                push_pending(event.gamepad().map(|g| g.index()).unwrap_or(0), false);
            }
        });
        if window
            .add_event_listener_with_callback("gamepadconnected", connected.as_ref().unchecked_ref())
            .is_err()
        {
            warn!("failed to register gamepadconnected listener");
        }
        if window
            .add_event_listener_with_callback("gamepaddisconnected", disconnected.as_ref().unchecked_ref())
            .is_err()
        {
            warn!("failed to register gamepaddisconnected listener");
        }
        self.connected_closure = Some(connected);
        self.disconnected_closure = Some(disconnected);

        // Enumerate already-connected pads synchronously (§4.4's
        // `init_platform` contract: emit a synthetic Connect for each).
        for gamepad in get_gamepads() {
            register(container, &gamepad);
        }
    }

    fn free_platform(&mut self) {
        if let Some(window) = web_sys::window() {
            if let Some(c) = &self.connected_closure {
                let _ = window.remove_event_listener_with_callback("gamepadconnected", c.as_ref().unchecked_ref());
            }
            if let Some(c) = &self.disconnected_closure {
                let _ =
                    window.remove_event_listener_with_callback("gamepaddisconnected", c.as_ref().unchecked_ref());
            }
        }
        self.connected_closure = None;
        self.disconnected_closure = None;
    }

    fn poll_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) -> bool {
        let mut any = false;
        let pending: Vec<PendingHotplug> = PENDING.with(|p| p.borrow_mut().drain(..).collect());
        for event in pending {
            any = true;
            if event.connected {
                if let Some(gp) = get_gamepads().into_iter().find(|g| g.index() == event.browser_index) {
                    register(container, &gp);
                }
            } else {
                let idx = container.iter().find(|g| g.substate.browser_index == Some(event.browser_index)).map(|g| g.index());
                if let Some(idx) = idx {
                    container.handle_disconnect(idx);
                }
            }
        }
        any
    }

    fn update_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>, index: usize) -> bool {
        let Some(browser_index) = container.gamepad_mut(index).substate.browser_index else {
            return false;
        };
        let Some(gamepad) = get_gamepads().into_iter().find(|g| g.index() == browser_index) else {
            container.handle_disconnect(index);
            return true;
        };
        if !gamepad.connected() {
            container.handle_disconnect(index);
            return true;
        }

        let guid = container.gamepad_mut(index).guid().to_string();
        let mut any = false;

        let buttons = gamepad.buttons();
        for code in 0..(BUTTON_ORDER.len() as u32).min(buttons.length()) {
            let button = resolve_button(container, &guid, code);
            if button == Button::Unknown {
                continue;
            }
            let Ok(button_obj) = buttons.get(code).dyn_into::<web_sys::GamepadButton>() else {
                continue;
            };
            any = true;
            container.dispatch_button(index, button, button_obj.pressed());
            if button.is_trigger_shadow() {
                let trigger_axis = if button == Button::LeftTrigger { Axis::LeftTrigger } else { Axis::RightTrigger };
                container.dispatch_axis(index, trigger_axis, (button_obj.value() * 2.0 - 1.0) as f32);
            }
        }

        let axes = gamepad.axes();
        for code in 0..(AXIS_ORDER.len() as u32).min(axes.length()) {
            let axis = resolve_axis(container, &guid, code);
            if axis == Axis::Unknown {
                continue;
            }
            let Some(value) = axes.get(code).as_f64() else { continue };
            any = true;
            container.dispatch_axis(index, axis, value as f32);
        }

        any
    }

    fn release_platform(&mut self, gamepad: &mut Gamepad) {
        gamepad.substate.browser_index = None;
    }

    fn get_button_platform(&self, native_code: u32) -> Button {
        fallback_button(native_code)
    }

    fn get_axis_platform(&self, native_code: u32) -> Axis {
        fallback_axis(native_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_button_resolves_standard_layout() {
        assert_eq!(fallback_button(0), Button::South);
        assert_eq!(fallback_button(6), Button::LeftTrigger);
        assert_eq!(fallback_button(16), Button::Guide);
        assert_eq!(fallback_button(99), Button::Unknown);
    }

    #[test]
    fn fallback_axis_resolves_core_sticks() {
        assert_eq!(fallback_axis(0), Axis::LeftX);
        assert_eq!(fallback_axis(3), Axis::RightY);
        assert_eq!(fallback_axis(4), Axis::Unknown);
    }

    #[test]
    fn device_guid_falls_back_to_name_seed_without_vendor_product() {
        let guid = device_guid("A Generic Pad With No Ids");
        assert_eq!(guid.len(), 32);
        assert!(guid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn device_guid_extracts_chromium_style_vendor_product() {
        let guid = device_guid("054c-05c4-Sony Computer Entertainment Wireless Controller");
        assert_eq!(&guid[8..12], "4c05");
        assert_eq!(&guid[16..20], "c405");
    }
}
