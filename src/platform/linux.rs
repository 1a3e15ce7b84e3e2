//! Linux backend: evdev device I/O plus `inotify` hot-plug (§4.4.1).
//!
//! Devices are opened directly under `/dev/input/eventN` rather than
//! through udev, matching the "scan `/dev/input/`" discovery protocol the
//! spec mandates. Every descriptor is opened `O_NONBLOCK`; a poll cycle
//! never blocks (§5).

use std::ffi::CString;
use std::fs;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

use inotify::{EventMask, Inotify, WatchMask};
use log::{debug, trace, warn};
use vec_map::VecMap;

use crate::gamepad::{Gamepad, Gamepads};
use crate::mapping::Mapping;
use crate::model::{Axis, Button};
use crate::platform::PlatformBackend;

const EV_KEY: u16 = 0x01;
const EV_ABS: u16 = 0x03;

const BTN_MISC: u16 = 0x100;
const KEY_CNT: u16 = 0x2ff + 1;
const ABS_CNT: u16 = 0x3f + 1;

const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const ABS_Z: u16 = 0x02;
const ABS_RX: u16 = 0x03;
const ABS_RY: u16 = 0x04;
const ABS_RZ: u16 = 0x05;
const ABS_HAT0X: u16 = 0x10;
const ABS_HAT0Y: u16 = 0x11;

const BTN_A: u16 = 0x130;

/// `struct input_id` (`linux/input.h`): §4.4.1 GUID synthesis input.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

/// `struct input_absinfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct InputAbsinfo {
    value: i32,
    minimum: i32,
    maximum: i32,
    fuzz: i32,
    flat: i32,
    resolution: i32,
}

/// `struct input_event`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputEvent {
    tv_sec: i64,
    tv_usec: i64,
    kind: u16,
    code: u16,
    value: i32,
}

/// Builds a Linux ioctl request number the way `<asm-generic/ioctl.h>`
/// does: `_IOC(dir, type, nr, size)`. `EVIOCGBIT`'s `nr` depends on the
/// event type being queried, which is only known at the call site, so this
/// is computed rather than declared via a fixed-`nr` macro.
const fn ioc_read(ty: u8, nr: u8, size: usize) -> libc::c_ulong {
    const IOC_READ: libc::c_ulong = 2;
    const NRBITS: u32 = 8;
    const TYPEBITS: u32 = 8;
    const SIZEBITS: u32 = 14;
    (IOC_READ << (NRBITS + TYPEBITS + SIZEBITS))
        | ((ty as libc::c_ulong) << NRBITS)
        | (nr as libc::c_ulong)
        | ((size as libc::c_ulong) << (NRBITS + TYPEBITS))
}

fn eviocgbit(fd: RawFd, ev_type: u16, buf: &mut [u8]) -> bool {
    let req = ioc_read(b'E', 0x20 + ev_type as u8, buf.len());
    unsafe { libc::ioctl(fd, req as _, buf.as_mut_ptr()) >= 0 }
}

fn eviocgabs(fd: RawFd, axis: u16, info: &mut InputAbsinfo) -> bool {
    let req = ioc_read(b'E', 0x40 + axis as u8, std::mem::size_of::<InputAbsinfo>());
    unsafe { libc::ioctl(fd, req as _, info as *mut InputAbsinfo) >= 0 }
}

fn eviocgid(fd: RawFd, id: &mut InputId) -> bool {
    let req = ioc_read(b'E', 0x02, std::mem::size_of::<InputId>());
    unsafe { libc::ioctl(fd, req as _, id as *mut InputId) >= 0 }
}

fn eviocgname(fd: RawFd, buf: &mut [u8]) -> bool {
    let req = ioc_read(b'E', 0x06, buf.len());
    unsafe { libc::ioctl(fd, req as _, buf.as_mut_ptr()) >= 0 }
}

fn test_bit(bit: u16, bits: &[u8]) -> bool {
    let byte = (bit / 8) as usize;
    let shift = bit % 8;
    byte < bits.len() && bits[byte] & (1 << shift) != 0
}

/// Per-gamepad evdev state (§3.3's `src` field for the Linux variant).
#[derive(Debug)]
pub struct Substate {
    fd: RawFd,
    /// `keyMap[native code - BTN_MISC] -> ButtonCount` isn't needed directly;
    /// instead we resolve straight to canonical via mapping/fallback and
    /// only keep the raw-code set so `update` knows which codes exist.
    key_codes: VecMap<()>,
    abs_codes: VecMap<InputAbsinfo>,
    full_path: String,
}

impl Substate {
    fn new() -> Self {
        Substate {
            fd: -1,
            key_codes: VecMap::new(),
            abs_codes: VecMap::new(),
            full_path: String::new(),
        }
    }
}

impl Default for Substate {
    fn default() -> Self {
        Substate::new()
    }
}

#[derive(Default)]
pub struct LinuxBackend {
    inotify: Option<Inotify>,
}

const INPUT_DIR: &str = "/dev/input";

fn device_id_to_guid(id: InputId, name: &str) -> String {
    if id.vendor != 0 && id.product != 0 && id.version != 0 {
        format!(
            "{:02x}{:02x}0000{:02x}{:02x}0000{:02x}{:02x}0000{:02x}{:02x}0000",
            id.bustype as u8,
            (id.bustype >> 8) as u8,
            id.vendor as u8,
            (id.vendor >> 8) as u8,
            id.product as u8,
            (id.product >> 8) as u8,
            id.version as u8,
            (id.version >> 8) as u8,
        )
    } else {
        let bytes: Vec<u8> = name.bytes().take(11).collect();
        let mut padded = [0u8; 11];
        padded[..bytes.len()].copy_from_slice(&bytes);
        format!(
            "{:02x}{:02x}0000{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}00",
            padded[0],
            padded[1],
            padded[2],
            padded[3],
            padded[4],
            padded[5],
            padded[6],
            padded[7],
            padded[8],
            padded[9],
            padded[10],
            0u8,
            0u8,
        )
    }
}

fn read_name(fd: RawFd) -> String {
    let mut buf = [0u8; 128];
    if eviocgname(fd, &mut buf) {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end]).into_owned()
    } else {
        "Unknown".to_string()
    }
}

/// Default native-code fallback table (§4.4): used when the mapping DB has
/// no entry for this device. Covers the common evdev `BTN_GAMEPAD` block.
fn fallback_button(code: u16) -> Button {
    match code {
        0x130 => Button::South,  // BTN_A / BTN_SOUTH
        0x131 => Button::East,   // BTN_B / BTN_EAST
        0x133 => Button::North,  // BTN_Y / BTN_NORTH (swapped with West per SDL convention)
        0x134 => Button::West,   // BTN_X / BTN_WEST
        0x136 => Button::LeftShoulder,
        0x137 => Button::RightShoulder,
        0x138 => Button::LeftTrigger,
        0x139 => Button::RightTrigger,
        0x13a => Button::Back,
        0x13b => Button::Start,
        0x13c => Button::Guide,
        0x13d => Button::LeftStick,
        0x13e => Button::RightStick,
        _ => Button::Unknown,
    }
}

fn fallback_axis(code: u16) -> Axis {
    match code {
        ABS_X => Axis::LeftX,
        ABS_Y => Axis::LeftY,
        ABS_RX => Axis::RightX,
        ABS_RY => Axis::RightY,
        ABS_Z => Axis::LeftTrigger,
        ABS_RZ => Axis::RightTrigger,
        ABS_HAT0X => Axis::HatDpadLeftRight,
        ABS_HAT0Y => Axis::HatDpadUpDown,
        _ => Axis::Unknown,
    }
}

fn resolve_button(mapping: Option<&Mapping>, code: u16) -> Button {
    let mapped = mapping
        .map(|m| m.translate_button(code.min(255) as u8))
        .unwrap_or(Button::Unknown);
    if mapped != Button::Unknown {
        mapped
    } else {
        fallback_button(code)
    }
}

fn resolve_axis(mapping: Option<&Mapping>, code: u16) -> Axis {
    let mapped = mapping
        .map(|m| m.translate_axis(code as usize))
        .unwrap_or(Axis::Unknown);
    if mapped != Axis::Unknown {
        mapped
    } else {
        fallback_axis(code)
    }
}

fn normalize_abs(raw: i32, info: &InputAbsinfo) -> f32 {
    if info.maximum == info.minimum {
        return 0.0;
    }
    let span = (info.maximum - info.minimum) as f32;
    ((raw - info.minimum) as f32 / span) * 2.0 - 1.0
}

impl LinuxBackend {
    fn open_device(path: &std::path::Path) -> Option<(RawFd, InputId, String, VecMap<()>, VecMap<InputAbsinfo>)> {
        let c_path = CString::new(path.to_str()?).ok()?;
        let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK) };
        if fd < 0 {
            return None;
        }

        let mut key_bits = [0u8; (KEY_CNT / 8 + 1) as usize];
        let mut abs_bits = [0u8; (ABS_CNT / 8 + 1) as usize];
        eviocgbit(fd, EV_KEY, &mut key_bits);
        let has_abs = eviocgbit(fd, EV_ABS, &mut abs_bits) && !abs_bits.iter().all(|&b| b == 0);
        if !has_abs {
            // Require EV_ABS capability to count as a joystick (§4.4.1).
            unsafe { libc::close(fd) };
            return None;
        }

        let mut id = InputId::default();
        eviocgid(fd, &mut id);
        let name = read_name(fd);

        let mut key_codes = VecMap::new();
        let mut button_count = 0usize;
        for code in BTN_MISC..KEY_CNT {
            if test_bit(code, &key_bits) {
                key_codes.insert(code as usize, ());
                button_count += 1;
            }
        }
        let mut axis_codes = VecMap::new();
        let mut axis_count = 0usize;
        for code in 0..ABS_CNT {
            if test_bit(code, &abs_bits) {
                let mut info = InputAbsinfo::default();
                eviocgabs(fd, code, &mut info);
                axis_codes.insert(code as usize, info);
                axis_count += 1;
            }
        }

        if button_count == 0 && axis_count == 0 {
            unsafe { libc::close(fd) };
            return None;
        }
        if button_count > crate::model::BUTTON_COUNT + 10 {
            warn!("{}: implausible button count {button_count}, ignoring device", path.display());
            unsafe { libc::close(fd) };
            return None;
        }

        Some((fd, id, name, key_codes, axis_codes))
    }

    fn setup_device<const N: usize, const E: usize>(
        &self,
        path: &std::path::Path,
        container: &mut Gamepads<N, E>,
    ) {
        let Some((fd, id, name, key_codes, axis_codes)) = Self::open_device(path) else {
            return;
        };
        let guid = device_id_to_guid(id, &name);

        let mut substate = Substate::new();
        substate.fd = fd;
        substate.key_codes = key_codes.clone();
        substate.abs_codes = axis_codes.clone();
        substate.full_path = path.to_string_lossy().into_owned();

        let Some(idx) = container.handle_connect(guid, name, substate) else {
            unsafe { libc::close(fd) };
            return;
        };

        let resolved_guid = container.gamepad_mut(idx).guid().to_string();
        let mapping = container.mapping_db().resolve(&resolved_guid).cloned();
        let gamepad = container.gamepad_mut(idx);
        for (code, _) in key_codes.iter() {
            let button = resolve_button(mapping.as_ref(), code as u16);
            if button != Button::Unknown {
                gamepad.set_button_supported(button, true);
            }
        }
        for (&code, info) in axis_codes.iter() {
            let code = code as u16;
            let axis = resolve_axis(mapping.as_ref(), code);
            if axis != Axis::Unknown {
                let deadzone = axis.default_deadzone();
                gamepad.set_axis_supported(axis, true, deadzone);
            }
            if code == ABS_Z {
                gamepad.set_button_supported(Button::LeftTrigger, true);
            } else if code == ABS_RZ {
                gamepad.set_button_supported(Button::RightTrigger, true);
            } else if code == ABS_HAT0X {
                gamepad.set_button_supported(Button::DpadLeft, true);
                gamepad.set_button_supported(Button::DpadRight, true);
            } else if code == ABS_HAT0Y {
                gamepad.set_button_supported(Button::DpadUp, true);
                gamepad.set_button_supported(Button::DpadDown, true);
            }
            let _ = info;
        }
    }
}

impl PlatformBackend for LinuxBackend {
    fn init_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) {
        let entries = match fs::read_dir(INPUT_DIR) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot read {INPUT_DIR}: {e}, no gamepads will be discovered");
                container.record_platform_error(crate::error::PlatformError::with_source(
                    format!("cannot read {INPUT_DIR}"),
                    e,
                ));
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("event")))
            .collect();
        paths.sort();
        for path in paths {
            self.setup_device(&path, container);
        }

        match Inotify::init() {
            Ok(inotify) => {
                if let Err(e) = inotify.watches().add(
                    INPUT_DIR,
                    WatchMask::CREATE | WatchMask::ATTRIB | WatchMask::DELETE,
                ) {
                    warn!("failed to watch {INPUT_DIR}: {e}");
                }
                self.inotify = Some(inotify);
            }
            Err(e) => warn!("inotify unavailable, hot-plug disabled: {e}"),
        }
    }

    fn free_platform(&mut self) {
        self.inotify = None;
    }

    fn poll_platform<const N: usize, const E: usize>(&mut self, container: &mut Gamepads<N, E>) -> bool {
        let Some(inotify) = self.inotify.as_mut() else { return false };
        let mut buffer = [0u8; 4096];
        let events = match inotify.read_events(&mut buffer) {
            Ok(events) => events,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return false,
            Err(e) => {
                warn!("inotify read failed: {e}");
                return false;
            }
        };

        let mut any = false;
        let mut created = Vec::new();
        let mut deleted_paths = Vec::new();
        for event in events {
            let Some(name) = event.name.and_then(|n| n.to_str().map(str::to_string)) else {
                continue;
            };
            if !name.starts_with("event") {
                continue;
            }
            if event.mask.contains(EventMask::CREATE) || event.mask.contains(EventMask::ATTRIB) {
                created.push(PathBuf::from(INPUT_DIR).join(name));
            } else if event.mask.contains(EventMask::DELETE) {
                deleted_paths.push(PathBuf::from(INPUT_DIR).join(name).to_string_lossy().into_owned());
            }
        }

        for path in deleted_paths {
            let idx = container
                .iter()
                .find(|g| g.substate.full_path == path)
                .map(|g| g.index());
            if let Some(idx) = idx {
                container.handle_disconnect(idx);
                any = true;
            }
        }
        for path in created {
            self.setup_device(&path, container);
            any = true;
        }
        any
    }

    fn update_platform<const N: usize, const E: usize>(
        &mut self,
        container: &mut Gamepads<N, E>,
        index: usize,
    ) -> bool {
        let fd = container.gamepad_mut(index).substate.fd;

        let mut any = false;
        let mut buf = MaybeUninit::<InputEvent>::uninit();
        let size = std::mem::size_of::<InputEvent>();
        loop {
            let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, size) };
            if n <= 0 {
                if n < 0 {
                    let err = std::io::Error::last_os_error();
                    if err.kind() != std::io::ErrorKind::WouldBlock {
                        debug!("gamepad {index} read error: {err}, disconnecting");
                        container.handle_disconnect(index);
                        return true;
                    }
                }
                break;
            }
            if n as usize != size {
                continue;
            }
            let ev = unsafe { buf.assume_init() };
            any |= self.handle_raw_event(container, index, ev);
        }
        any
    }

    fn release_platform(&mut self, gamepad: &mut Gamepad) {
        if gamepad.substate.fd >= 0 {
            unsafe { libc::close(gamepad.substate.fd) };
        }
    }

    fn get_button_platform(&self, native_code: u32) -> Button {
        fallback_button(native_code as u16)
    }

    fn get_axis_platform(&self, native_code: u32) -> Axis {
        fallback_axis(native_code as u16)
    }
}

impl LinuxBackend {
    /// Translates one raw `input_event` into canonical button/axis
    /// dispatches (§4.4.1's per-frame update, including the synthesized
    /// trigger-shadow and hat-shadow button events).
    fn handle_raw_event<const N: usize, const E: usize>(
        &self,
        container: &mut Gamepads<N, E>,
        index: usize,
        ev: InputEvent,
    ) -> bool {
        let resolved_guid = container.gamepad_mut(index).guid().to_string();
        let mapping = container.mapping_db().resolve(&resolved_guid).cloned();
        match ev.kind {
            k if k == EV_KEY => {
                let button = resolve_button(mapping.as_ref(), ev.code);
                if button == Button::Unknown {
                    trace!("gamepad {index}: dropping unmapped key code {}", ev.code);
                    return false;
                }
                container.dispatch_button(index, button, ev.value != 0);
                true
            }
            k if k == EV_ABS => {
                let axis = resolve_axis(mapping.as_ref(), ev.code);
                if axis == Axis::Unknown {
                    trace!("gamepad {index}: dropping unmapped abs code {}", ev.code);
                    return false;
                }
                let info = container
                    .gamepad_mut(index)
                    .substate
                    .abs_codes
                    .get(ev.code as usize)
                    .copied();
                let Some(info) = info else { return false };
                let value = normalize_abs(ev.value, &info);
                container.dispatch_axis(index, axis, value);

                if ev.code == ABS_Z {
                    container.dispatch_button(index, Button::LeftTrigger, value >= 0.98);
                } else if ev.code == ABS_RZ {
                    container.dispatch_button(index, Button::RightTrigger, value >= 0.98);
                } else if ev.code == ABS_HAT0X {
                    container.dispatch_button(index, Button::DpadLeft, value < 0.0);
                    container.dispatch_button(index, Button::DpadRight, value > 0.0);
                } else if ev.code == ABS_HAT0Y {
                    container.dispatch_button(index, Button::DpadUp, value < 0.0);
                    container.dispatch_button(index, Button::DpadDown, value > 0.0);
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_from_input_id_uses_little_endian_byte_pairs() {
        let id = InputId {
            bustype: 3,
            vendor: 0x045e,
            product: 0x028e,
            version: 0x0114,
        };
        let guid = device_id_to_guid(id, "Xbox 360 Controller");
        assert_eq!(guid, "030000005e0400008e02000014010000");
    }

    #[test]
    fn guid_falls_back_to_name_bytes_when_ids_are_zero() {
        let id = InputId::default();
        let guid = device_id_to_guid(id, "ABCDEFGHIJKLMNOP");
        assert_eq!(guid.len(), 32);
        assert!(guid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn normalize_abs_maps_full_range_to_unit_interval() {
        let info = InputAbsinfo {
            value: 0,
            minimum: 0,
            maximum: 255,
            fuzz: 0,
            flat: 0,
            resolution: 0,
        };
        assert!((normalize_abs(0, &info) - -1.0).abs() < 0.01);
        assert!((normalize_abs(255, &info) - 1.0).abs() < 0.01);
        assert!(normalize_abs(127, &info).abs() < 0.02);
    }

    #[test]
    fn fallback_table_resolves_core_buttons() {
        assert_eq!(fallback_button(BTN_A), Button::South);
        assert_eq!(fallback_axis(ABS_X), Axis::LeftX);
        assert_eq!(fallback_axis(ABS_HAT0X), Axis::HatDpadLeftRight);
    }
}
