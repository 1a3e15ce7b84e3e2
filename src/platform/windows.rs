//! Windows backend: XInput polling plus DirectInput for devices XInput
//! doesn't own (§4.4.2). A hidden message-only window observes
//! `WM_DEVICECHANGE` so DirectInput re-enumeration only happens on an
//! actual hot-plug rather than every frame.

use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};
use winapi::shared::guiddef::GUID;
use winapi::shared::minwindef::{LPARAM, LRESULT, UINT, WPARAM};
use winapi::shared::windef::HWND;
use winapi::shared::winerror::{DIERR_INPUTLOST, DIERR_NOTACQUIRED, ERROR_SUCCESS};
use winapi::um::dinput::{
    self, IDirectInput8W, IDirectInputDevice8W, DIDEVICEINSTANCEW, DIJOYSTATE2, DIPROPDWORD,
    DIPROPHEADER, DIPH_DEVICE, DISCL_BACKGROUND, DISCL_NONEXCLUSIVE, DI8DEVCLASS_GAMECTRL,
    DIENUM_CONTINUE, DIPROPAXISMODE_ABS,
};
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::winuser::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, PeekMessageW, RegisterClassExW,
    TranslateMessage, CW_USEDEFAULT, MSG, PM_REMOVE, WM_DEVICECHANGE, WNDCLASSEXW, WS_OVERLAPPED,
};
use winapi::um::xinput::{
    XInputEnable, XInputGetState, XINPUT_GAMEPAD, XINPUT_GAMEPAD_A, XINPUT_GAMEPAD_B,
    XINPUT_GAMEPAD_BACK, XINPUT_GAMEPAD_DPAD_DOWN, XINPUT_GAMEPAD_DPAD_LEFT,
    XINPUT_GAMEPAD_DPAD_RIGHT, XINPUT_GAMEPAD_DPAD_UP, XINPUT_GAMEPAD_LEFT_SHOULDER,
    XINPUT_GAMEPAD_LEFT_THUMB, XINPUT_GAMEPAD_RIGHT_SHOULDER, XINPUT_GAMEPAD_RIGHT_THUMB,
    XINPUT_GAMEPAD_START, XINPUT_GAMEPAD_X, XINPUT_GAMEPAD_Y, XINPUT_STATE,
};

use crate::gamepad::{Gamepad, Gamepads};
use crate::model::{Axis, Button};
use crate::platform::PlatformBackend;

const XUSER_MAX_COUNT: u32 = 4;

/// Fires once whenever `WindowProc` observes `WM_DEVICECHANGE`. There is
/// only ever one backend instance per process (§5), so a process-wide flag
/// is simpler than threading a pointer through `SetPropW`.
static DEVICE_CHANGE_PENDING: AtomicBool = AtomicBool::new(false);

unsafe extern "system" fn window_proc(hwnd: HWND, msg: UINT, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_DEVICECHANGE {
        DEVICE_CHANGE_PENDING.store(true, Ordering::SeqCst);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn wide(s: &str) -> Vec<u16> {
    std::ffi::OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

fn create_message_window() -> Option<HWND> {
    unsafe {
        let hinstance = GetModuleHandleW(ptr::null());
        let class_name = wide("gamepadsMessageWindow");
        let wc = WNDCLASSEXW {
            cbSize: mem::size_of::<WNDCLASSEXW>() as UINT,
            style: 0,
            lpfnWndProc: Some(window_proc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: hinstance,
            hIcon: ptr::null_mut(),
            hCursor: ptr::null_mut(),
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };
        if RegisterClassExW(&wc) == 0 {
            warn!("RegisterClassExW failed for hot-plug window, hot-plug detection disabled");
            return None;
        }
        let hwnd = CreateWindowExW(
            0,
            class_name.as_ptr(),
            class_name.as_ptr(),
            WS_OVERLAPPED,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            ptr::null_mut(),
            ptr::null_mut(),
            hinstance,
            ptr::null_mut(),
        );
        if hwnd.is_null() {
            warn!("CreateWindowExW failed for hot-plug window, hot-plug detection disabled");
            None
        } else {
            Some(hwnd)
        }
    }
}

fn pump_messages() {
    unsafe {
        let mut msg = mem::zeroed::<MSG>();
        while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Per-gamepad Windows state (§3.3): either an XInput user index or a
/// DirectInput device handle, never both.
#[derive(Debug, Default)]
pub struct Substate {
    xinput_index: Option<u32>,
    dinput_device: Option<*mut IDirectInputDevice8W>,
    dinput_instance: Option<GUID>,
}

fn xinput_guid(subtype: u8) -> String {
    format!("78696e707574{:02x}000000000000000000", subtype)
}

fn xinput_name(subtype: u8) -> String {
    match subtype {
        0x01 => "Xbox Controller".to_string(),
        0x02 => "Xbox Wheel".to_string(),
        0x04 => "Xbox Flight Stick".to_string(),
        0x06 => "Xbox Guitar".to_string(),
        0x08 => "Xbox Drum Kit".to_string(),
        _ => "Xbox Controller".to_string(),
    }
}

fn xinput_button_table(buttons: u16) -> [(u16, Button); 14] {
    [
        (XINPUT_GAMEPAD_A, Button::South),
        (XINPUT_GAMEPAD_B, Button::East),
        (XINPUT_GAMEPAD_X, Button::West),
        (XINPUT_GAMEPAD_Y, Button::North),
        (XINPUT_GAMEPAD_BACK, Button::Back),
        (XINPUT_GAMEPAD_START, Button::Start),
        (XINPUT_GAMEPAD_LEFT_THUMB, Button::LeftStick),
        (XINPUT_GAMEPAD_RIGHT_THUMB, Button::RightStick),
        (XINPUT_GAMEPAD_LEFT_SHOULDER, Button::LeftShoulder),
        (XINPUT_GAMEPAD_RIGHT_SHOULDER, Button::RightShoulder),
        (XINPUT_GAMEPAD_DPAD_UP, Button::DpadUp),
        (XINPUT_GAMEPAD_DPAD_DOWN, Button::DpadDown),
        (XINPUT_GAMEPAD_DPAD_LEFT, Button::DpadLeft),
        (XINPUT_GAMEPAD_DPAD_RIGHT, Button::DpadRight),
    ]
    .map(|(mask, b)| (buttons & mask, b))
}

fn normalize_thumb(v: i16) -> f32 {
    (v as f32 + 0.5) / 32767.5
}

fn normalize_trigger(v: u8) -> f32 {
    v as f32 / 127.5 - 1.0
}

const MAX_DINPUT_DEVICES: usize = 16;

#[derive(Default)]
pub struct WindowsBackend {
    hwnd: Option<HWND>,
    dinput: Option<*mut IDirectInput8W>,
    xinput_owner: [Option<usize>; XUSER_MAX_COUNT as usize],
    dinput_seen: [Option<GUID>; MAX_DINPUT_DEVICES],
}

impl WindowsBackend {
    fn dinput_already_seen(&self, guid: &GUID) -> bool {
        self.dinput_seen.iter().flatten().any(|g| g == guid)
    }

    fn remember_dinput(&mut self, guid: GUID) {
        if let Some(slot) = self.dinput_seen.iter_mut().find(|s| s.is_none()) {
            *slot = Some(guid);
        }
    }

    fn forget_dinput(&mut self, guid: &GUID) {
        if let Some(slot) = self.dinput_seen.iter_mut().find(|s| s.as_ref() == Some(guid)) {
            *slot = None;
        }
    }
}

impl WindowsBackend {
    fn poll_xinput_slots<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        for i in 0..XUSER_MAX_COUNT {
            let mut state = unsafe { mem::zeroed::<XINPUT_STATE>() };
            let result = unsafe { XInputGetState(i, &mut state) };
            let owner = self.xinput_owner[i as usize];
            if result == ERROR_SUCCESS {
                match owner {
                    None => {
                        let subtype = 0x01u8;
                        let guid = xinput_guid(subtype);
                        let name = xinput_name(subtype);
                        let substate = Substate {
                            xinput_index: Some(i),
                            dinput_device: None,
                            dinput_instance: None,
                        };
                        if let Some(idx) = container.handle_connect(guid, name, substate) {
                            let gamepad = container.gamepad_mut(idx);
                            for button in [
                                Button::South, Button::East, Button::West, Button::North,
                                Button::Back, Button::Start, Button::LeftStick, Button::RightStick,
                                Button::LeftShoulder, Button::RightShoulder, Button::DpadUp,
                                Button::DpadDown, Button::DpadLeft, Button::DpadRight,
                                Button::LeftTrigger, Button::RightTrigger,
                            ] {
                                gamepad.set_button_supported(button, true);
                            }
                            for axis in [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY,
                                Axis::LeftTrigger, Axis::RightTrigger] {
                                gamepad.set_axis_supported(axis, true, axis.default_deadzone());
                            }
                            self.xinput_owner[i as usize] = Some(idx);
                            debug!("xinput slot {i} connected as gamepad {idx}");
                        }
                    }
                    Some(idx) => self.apply_xinput_state(container, idx, &state.Gamepad),
                }
            } else if let Some(idx) = owner {
                debug!("xinput slot {i} disconnected");
                container.handle_disconnect(idx);
                self.xinput_owner[i as usize] = None;
            }
        }
    }

    fn apply_xinput_state<const N: usize, const E: usize>(
        &self,
        container: &mut Gamepads<N, E>,
        idx: usize,
        pad: &XINPUT_GAMEPAD,
    ) {
        for (masked, button) in xinput_button_table(pad.wButtons) {
            container.dispatch_button(idx, button, masked != 0);
        }
        container.dispatch_axis(idx, Axis::LeftX, normalize_thumb(pad.sThumbLX));
        container.dispatch_axis(idx, Axis::LeftY, -normalize_thumb(pad.sThumbLY));
        container.dispatch_axis(idx, Axis::RightX, normalize_thumb(pad.sThumbRX));
        container.dispatch_axis(idx, Axis::RightY, -normalize_thumb(pad.sThumbRY));
        let lt = normalize_trigger(pad.bLeftTrigger);
        let rt = normalize_trigger(pad.bRightTrigger);
        container.dispatch_axis(idx, Axis::LeftTrigger, lt);
        container.dispatch_axis(idx, Axis::RightTrigger, rt);
        container.dispatch_button(idx, Button::LeftTrigger, lt > 0.0);
        container.dispatch_button(idx, Button::RightTrigger, rt > 0.0);
    }

    /// `supportsXInput` (§4.4.2): XInput-capable HID devices expose `IG_`
    /// in their raw-input device path; DirectInput must skip them since
    /// XInput already owns them.
    fn supports_xinput(vid: u16, pid: u16) -> bool {
        raw_input_device_names()
            .into_iter()
            .any(|name| name.contains("IG_") && name_has_vid_pid(&name, vid, pid))
    }

    fn enumerate_dinput<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        let Some(dinput) = self.dinput else { return };
        let hwnd = self.hwnd;
        let mut ctx = EnumCtx { backend: self, container, hwnd };
        unsafe {
            (*dinput).EnumDevices(
                DI8DEVCLASS_GAMECTRL,
                Some(enum_devices_callback::<N, E>),
                &mut ctx as *mut EnumCtx<N, E> as *mut _,
                dinput::DIEDFL_ATTACHEDONLY,
            );
        }
    }
}

struct EnumCtx<'a, const N: usize, const E: usize> {
    backend: &'a mut WindowsBackend,
    container: &'a mut Gamepads<N, E>,
    hwnd: Option<HWND>,
}

unsafe extern "system" fn enum_devices_callback<const N: usize, const E: usize>(
    instance: *const DIDEVICEINSTANCEW,
    pv_ref: winapi::shared::minwindef::LPVOID,
) -> winapi::shared::minwindef::BOOL {
    let ctx = &mut *(pv_ref as *mut EnumCtx<N, E>);
    let inst = &*instance;
    let guid_product = inst.guidProduct;
    let vid = (guid_product.Data1 & 0xffff) as u16;
    let pid = (guid_product.Data1 >> 16) as u16;
    if WindowsBackend::supports_xinput(vid, pid) {
        return DIENUM_CONTINUE;
    }
    if ctx.backend.dinput_already_seen(&inst.guidInstance) {
        return DIENUM_CONTINUE;
    }

    let name = String::from_utf16_lossy(&inst.tszInstanceName)
        .trim_end_matches('\0')
        .to_string();
    let guid = dinput_guid_to_string(&guid_product, &name);

    let Some(dinput) = ctx.backend.dinput else { return DIENUM_CONTINUE };
    let mut device: *mut IDirectInputDevice8W = ptr::null_mut();
    let hr = (*dinput).CreateDevice(&inst.guidInstance, &mut device, ptr::null_mut());
    if hr != 0 || device.is_null() {
        return DIENUM_CONTINUE;
    }
    if (*device).SetDataFormat(&dinput::c_dfDIJoystick2) != 0 {
        (*device).Release();
        return DIENUM_CONTINUE;
    }
    if let Some(hwnd) = ctx.hwnd {
        (*device).SetCooperativeLevel(hwnd, DISCL_NONEXCLUSIVE | DISCL_BACKGROUND);
    }
    let prop = DIPROPDWORD {
        diph: DIPROPHEADER {
            dwSize: mem::size_of::<DIPROPDWORD>() as UINT,
            dwHeaderSize: mem::size_of::<DIPROPHEADER>() as UINT,
            dwObj: 0,
            dwHow: DIPH_DEVICE,
        },
        dwData: DIPROPAXISMODE_ABS,
    };
    (*device).SetProperty(dinput::DIPROP_AXISMODE(), &prop.diph);
    let _ = (*device).Poll();
    let _ = (*device).Acquire();

    let substate = Substate {
        xinput_index: None,
        dinput_device: Some(device),
        dinput_instance: Some(inst.guidInstance),
    };
    let Some(idx) = ctx.container.handle_connect(guid, name, substate) else {
        (*device).Release();
        return DIENUM_CONTINUE;
    };
    ctx.backend.remember_dinput(inst.guidInstance);
    let gamepad = ctx.container.gamepad_mut(idx);
    for button in [Button::South, Button::East, Button::West, Button::North,
        Button::LeftShoulder, Button::RightShoulder, Button::Back, Button::Start,
        Button::LeftStick, Button::RightStick] {
        gamepad.set_button_supported(button, true);
    }
    for axis in [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY,
        Axis::LeftTrigger, Axis::RightTrigger] {
        gamepad.set_axis_supported(axis, true, axis.default_deadzone());
    }
    gamepad.set_button_supported(Button::DpadLeft, true);
    gamepad.set_button_supported(Button::DpadRight, true);
    gamepad.set_button_supported(Button::DpadUp, true);
    gamepad.set_button_supported(Button::DpadDown, true);
    gamepad.set_axis_supported(Axis::HatDpadLeftRight, true, 0.0);
    gamepad.set_axis_supported(Axis::HatDpadUpDown, true, 0.0);
    DIENUM_CONTINUE
}

fn dinput_guid_to_string(guid: &GUID, name: &str) -> String {
    if guid.Data4[2..8] == *b"PIDVID" {
        let vid = (guid.Data1 & 0xffff) as u16;
        let pid = (guid.Data1 >> 16) as u16;
        format!(
            "03000000{:02x}{:02x}0000{:02x}{:02x}000000000000",
            vid as u8,
            (vid >> 8) as u8,
            pid as u8,
            (pid >> 8) as u8,
        )
    } else {
        let bytes: Vec<u8> = name.bytes().take(16).collect();
        let mut padded = [0u8; 16];
        padded[..bytes.len()].copy_from_slice(&bytes);
        padded.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn name_has_vid_pid(device_path: &str, vid: u16, pid: u16) -> bool {
    let needle_vid = format!("VID_{vid:04X}");
    let needle_pid = format!("PID_{pid:04X}");
    device_path.contains(&needle_vid) && device_path.contains(&needle_pid)
}

fn raw_input_device_names() -> Vec<String> {
    use winapi::um::winuser::{GetRawInputDeviceInfoW, GetRawInputDeviceList, RAWINPUTDEVICELIST, RIDI_DEVICENAME};
    unsafe {
        let mut count: UINT = 0;
        let size = mem::size_of::<RAWINPUTDEVICELIST>() as UINT;
        if GetRawInputDeviceList(ptr::null_mut(), &mut count, size) != 0 {
            return Vec::new();
        }
        let mut list: Vec<RAWINPUTDEVICELIST> = vec![mem::zeroed(); count as usize];
        let got = GetRawInputDeviceList(list.as_mut_ptr(), &mut count, size);
        if got == u32::MAX {
            return Vec::new();
        }
        list.truncate(got as usize);
        let mut names = Vec::new();
        for dev in list {
            let mut len: UINT = 0;
            GetRawInputDeviceInfoW(dev.hDevice, RIDI_DEVICENAME, ptr::null_mut(), &mut len);
            if len == 0 {
                continue;
            }
            let mut buf: Vec<u16> = vec![0; len as usize];
            let written = GetRawInputDeviceInfoW(dev.hDevice, RIDI_DEVICENAME, buf.as_mut_ptr() as *mut _, &mut len);
            if written as i32 <= 0 {
                continue;
            }
            let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
            names.push(String::from_utf16_lossy(&buf[..end]));
        }
        names
    }
}

fn pov_to_dpad(pov: u32) -> (bool, bool, bool, bool) {
    if pov == 0xFFFFFFFF {
        return (false, false, false, false);
    }
    let angle = pov as f32 / 100.0;
    let up = !(67.5..292.5).contains(&angle);
    let down = (112.5..247.5).contains(&angle);
    let left = (202.5..337.5).contains(&angle);
    let right = (22.5..157.5).contains(&angle);
    (up, down, left, right)
}

impl PlatformBackend for WindowsBackend {
    fn init_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        // TODO: XInput tops out at 4 slots and misses triggers' combined
        // axis; GameInput (`Microsoft.Gaming.Input`) fixes both but isn't
        // wired up here yet, same gap the teacher's own backend carries.
        unsafe { XInputEnable(1) };
        self.poll_xinput_slots(container);

        self.hwnd = create_message_window();

        unsafe {
            let hinstance = GetModuleHandleW(ptr::null());
            let mut dinput: *mut IDirectInput8W = ptr::null_mut();
            let hr = dinput::DirectInput8Create(
                hinstance as _,
                dinput::DIRECTINPUT_VERSION,
                &dinput::IID_IDirectInput8W,
                &mut dinput as *mut _ as *mut _,
                ptr::null_mut(),
            );
            if hr == 0 && !dinput.is_null() {
                self.dinput = Some(dinput);
            } else {
                warn!("DirectInput8Create failed (hr={hr:#x}), non-XInput devices will not be found");
                container.record_platform_error(crate::error::PlatformError::new(format!(
                    "DirectInput8Create failed (hr={hr:#x})"
                )));
            }
        }
        self.enumerate_dinput(container);
    }

    fn free_platform(&mut self) {
        if let Some(dinput) = self.dinput.take() {
            unsafe { (*dinput).Release() };
        }
        self.hwnd = None;
    }

    fn poll_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) -> bool {
        pump_messages();
        self.poll_xinput_slots(container);
        if DEVICE_CHANGE_PENDING.swap(false, Ordering::SeqCst) {
            trace!("WM_DEVICECHANGE observed, re-enumerating DirectInput devices");
            self.enumerate_dinput(container);
            true
        } else {
            false
        }
    }

    fn update_platform<const N: usize, const E: usize>(
        &mut self,
        container: &mut Gamepads<N, E>,
        index: usize,
    ) -> bool {
        let Some(device) = container.gamepad_mut(index).substate.dinput_device else {
            return false;
        };
        unsafe {
            let mut hr = (*device).Poll();
            if hr as u32 == DIERR_NOTACQUIRED as u32 || hr as u32 == DIERR_INPUTLOST as u32 {
                (*device).Acquire();
                hr = (*device).Poll();
            }
            let mut state = mem::zeroed::<DIJOYSTATE2>();
            hr = (*device).GetDeviceState(mem::size_of::<DIJOYSTATE2>() as UINT, &mut state as *mut _ as *mut _);
            if hr as u32 == DIERR_NOTACQUIRED as u32 || hr as u32 == DIERR_INPUTLOST as u32 {
                if (*device).Acquire() != 0 {
                    debug!("gamepad {index}: DirectInput device permanently lost, disconnecting");
                    let instance = container.gamepad_mut(index).substate.dinput_instance;
                    container.handle_disconnect(index);
                    if let Some(guid) = instance {
                        self.forget_dinput(&guid);
                    }
                    return true;
                }
                return false;
            } else if hr != 0 {
                return false;
            }

            container.dispatch_axis(index, Axis::LeftX, state.lX as f32 / 32767.5 - 1.0);
            container.dispatch_axis(index, Axis::LeftY, state.lY as f32 / 32767.5 - 1.0);
            container.dispatch_axis(index, Axis::RightX, state.lRx as f32 / 32767.5 - 1.0);
            container.dispatch_axis(index, Axis::RightY, state.lRy as f32 / 32767.5 - 1.0);
            container.dispatch_axis(index, Axis::LeftTrigger, state.lZ as f32 / 32767.5 - 1.0);
            container.dispatch_axis(index, Axis::RightTrigger, state.lRz as f32 / 32767.5 - 1.0);

            let table = [
                (0usize, Button::South), (1, Button::East), (2, Button::West), (3, Button::North),
                (4, Button::LeftShoulder), (5, Button::RightShoulder),
                (6, Button::LeftTrigger), (7, Button::RightTrigger),
                (8, Button::Back), (9, Button::Start),
                (10, Button::LeftStick), (11, Button::RightStick),
            ];
            for (i, button) in table {
                container.dispatch_button(index, button, state.rgbButtons[i] & 0x80 != 0);
            }

            let pov = state.rgdwPOV[0];
            let (up, down, left, right) = pov_to_dpad(pov);
            container.dispatch_button(index, Button::DpadUp, up);
            container.dispatch_button(index, Button::DpadDown, down);
            container.dispatch_button(index, Button::DpadLeft, left);
            container.dispatch_button(index, Button::DpadRight, right);
            container.dispatch_axis(index, Axis::HatDpadLeftRight, if left { -1.0 } else if right { 1.0 } else { 0.0 });
            container.dispatch_axis(index, Axis::HatDpadUpDown, if up { -1.0 } else if down { 1.0 } else { 0.0 });
        }
        true
    }

    /// Closes the per-gamepad device handle. `xinput_owner`/`dinput_seen`
    /// bookkeeping is cleared at the call site instead of here: this runs
    /// against whichever `WindowsBackend` instance the container currently
    /// holds, which during a poll cycle is a transient placeholder (see
    /// `Gamepads::poll`'s `mem::take`), not the instance actually driving
    /// that cycle.
    fn release_platform(&mut self, gamepad: &mut Gamepad) {
        if let Some(device) = gamepad.substate.dinput_device.take() {
            unsafe {
                (*device).Unacquire();
                (*device).Release();
            }
        }
        gamepad.substate.dinput_instance = None;
        gamepad.substate.xinput_index = None;
    }

    fn get_button_platform(&self, native_code: u32) -> Button {
        for (mask, button) in xinput_button_table(native_code as u16) {
            if mask != 0 {
                return button;
            }
        }
        Button::Unknown
    }

    fn get_axis_platform(&self, native_code: u32) -> Axis {
        match native_code {
            0 => Axis::LeftX,
            1 => Axis::LeftY,
            2 => Axis::RightX,
            3 => Axis::RightY,
            4 => Axis::LeftTrigger,
            5 => Axis::RightTrigger,
            _ => Axis::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_thumb_is_symmetric_at_extremes() {
        assert!((normalize_thumb(32767) - 1.0).abs() < 0.01);
        assert!((normalize_thumb(-32768) - -1.0).abs() < 0.01);
    }

    #[test]
    fn normalize_trigger_spans_unit_range() {
        assert!((normalize_trigger(0) - -1.0).abs() < 0.01);
        assert!((normalize_trigger(255) - 1.0).abs() < 0.01);
    }

    #[test]
    fn xinput_guid_embeds_subtype() {
        let guid = xinput_guid(0x01);
        assert_eq!(guid.len(), 32);
        assert_eq!(guid, "78696e70757401000000000000000000");
    }

    #[test]
    fn pov_centered_yields_no_dpad() {
        assert_eq!(pov_to_dpad(0xFFFFFFFF), (false, false, false, false));
    }

    #[test]
    fn pov_up_is_recognized() {
        let (up, down, left, right) = pov_to_dpad(0);
        assert!(up);
        assert!(!down && !left && !right);
    }
}
