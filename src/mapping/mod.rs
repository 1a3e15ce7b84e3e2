//! SDL `GameControllerDB` mapping subsystem (§3.5, §4.2, §6.2).
//!
//! A [`Mapping`] translates one device's platform-native element codes into
//! canonical [`Button`]/[`Axis`] values. A [`MappingDb`] holds every mapping
//! known to the process, keyed by GUID, and is consulted once per newly
//! discovered gamepad (§4.4).

mod parser;

use fnv::FnvHashMap;
use log::{debug, warn};

use crate::error::MappingError;
use crate::model::{Axis, Button};
use parser::{Binding, Modifier, Parser, Token};

/// Native axis samples are normalized to this domain before a [`Mapping`]
/// ever sees them, mirroring the 16-bit signed range SDL itself normalizes
/// joystick axis samples into ahead of applying a game controller mapping.
/// Platform backends are responsible for getting raw hardware samples into
/// this range; the mapping layer only ever works in it.
pub const NATIVE_AXIS_MIN: i32 = -32768;
pub const NATIVE_AXIS_MAX: i32 = 32767;

const SDL_BUTTON_FIELDS: [(&str, Button); 15] = [
    ("a", Button::South),
    ("b", Button::East),
    ("x", Button::West),
    ("y", Button::North),
    ("back", Button::Back),
    ("start", Button::Start),
    ("guide", Button::Guide),
    ("leftshoulder", Button::LeftShoulder),
    ("rightshoulder", Button::RightShoulder),
    ("leftstick", Button::LeftStick),
    ("rightstick", Button::RightStick),
    ("dpup", Button::DpadUp),
    ("dpdown", Button::DpadDown),
    ("dpleft", Button::DpadLeft),
    ("dpright", Button::DpadRight),
];

const SDL_AXIS_FIELDS: [(&str, Axis); 6] = [
    ("leftx", Axis::LeftX),
    ("lefty", Axis::LeftY),
    ("rightx", Axis::RightX),
    ("righty", Axis::RightY),
    ("lefttrigger", Axis::LeftTrigger),
    ("righttrigger", Axis::RightTrigger),
];

const BUTTON_SLOTS: usize = SDL_BUTTON_FIELDS.len() + 1; // one spare slot (§3.5: buttons[16])
const AXIS_SLOTS: usize = SDL_AXIS_FIELDS.len();
/// Size of the reverse native-axis-code lookup table. Native axis codes on
/// every backend we target (evdev `ABS_*`, XInput/DirectInput object
/// indices, IOKit usage IDs, browser axis indices) fit comfortably under
/// this.
const AXIS_CODE_SPACE: usize = 64;

fn button_field_index(name: &str) -> Option<usize> {
    SDL_BUTTON_FIELDS.iter().position(|(n, _)| *n == name)
}

fn axis_field_index(name: &str) -> Option<usize> {
    SDL_AXIS_FIELDS.iter().position(|(n, _)| *n == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Axis,
    Button,
    HatBit,
}

/// One forward binding: "this SDL field lives at this native location."
#[derive(Debug, Clone, Copy)]
pub struct Element {
    pub kind: ElementKind,
    /// Native button/axis code, or hat number when `kind == HatBit`.
    pub index: u8,
    /// Hat direction bit (`SDL_HAT_UP` etc.); only meaningful for `HatBit`.
    pub hat_bit: u8,
    /// `normalized = (raw + axis_offset) * axis_scale`, clamped to the
    /// field's output range. `1.0`/`0.0` for non-axis kinds.
    pub axis_scale: f32,
    pub axis_offset: f32,
}

impl Element {
    fn button(index: u8) -> Self {
        Element {
            kind: ElementKind::Button,
            index,
            hat_bit: 0,
            axis_scale: 1.0,
            axis_offset: 0.0,
        }
    }

    fn hat_bit(hat: u8, bit: u8) -> Self {
        Element {
            kind: ElementKind::HatBit,
            index: hat,
            hat_bit: bit,
            axis_scale: 1.0,
            axis_offset: 0.0,
        }
    }

    fn axis(index: u8, inverted: bool, modifier: Modifier) -> Self {
        let (min, max, out_min, out_max) = match modifier {
            Modifier::None => (NATIVE_AXIS_MIN, NATIVE_AXIS_MAX, -1.0f32, 1.0f32),
            Modifier::Positive => (0, NATIVE_AXIS_MAX, 0.0f32, 1.0f32),
            Modifier::Negative => (NATIVE_AXIS_MIN, 0, -1.0f32, 0.0f32),
        };
        let scale = (out_max - out_min) / (max - min) as f32;
        let offset = out_min - min as f32 * scale;
        let (scale, offset) = if inverted {
            (-scale, -offset + out_min + out_max)
        } else {
            (scale, offset)
        };
        Element {
            kind: ElementKind::Axis,
            index,
            hat_bit: 0,
            axis_scale: scale,
            axis_offset: offset,
        }
    }

    /// Normalize a raw native sample (already in the `NATIVE_AXIS_MIN..=
    /// NATIVE_AXIS_MAX` domain) through this element's scale/offset.
    pub fn normalize(&self, raw: i32) -> f32 {
        ((raw as f32 + self.axis_offset) * self.axis_scale).clamp(-1.0, 1.0)
    }
}

/// A parsed SDL mapping line: forward tables (field -> native location) plus
/// reverse tables (native code -> canonical enum) built once at parse time.
#[derive(Debug, Clone)]
pub struct Mapping {
    guid: String,
    name: String,
    buttons: [Option<Element>; BUTTON_SLOTS],
    axes: [Option<Element>; AXIS_SLOTS],
    r_buttons: [Button; 256],
    r_axes: [Axis; AXIS_CODE_SPACE],
}

impl Mapping {
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical button bound to a native button code, if any.
    pub fn translate_button(&self, native_code: u8) -> Button {
        self.r_buttons[native_code as usize]
    }

    /// Canonical axis bound to a native axis code, if any.
    pub fn translate_axis(&self, native_code: usize) -> Axis {
        if native_code < AXIS_CODE_SPACE {
            self.r_axes[native_code]
        } else {
            Axis::Unknown
        }
    }

    /// The forward [`Element`] for a canonical button, if this mapping binds one.
    pub fn element_for_button(&self, button: Button) -> Option<&Element> {
        let field = SDL_BUTTON_FIELDS.iter().position(|(_, b)| *b == button)?;
        self.buttons[field].as_ref()
    }

    /// The forward [`Element`] for a canonical axis, if this mapping binds one.
    pub fn element_for_axis(&self, axis: Axis) -> Option<&Element> {
        let field = SDL_AXIS_FIELDS.iter().position(|(_, a)| *a == axis)?;
        self.axes[field].as_ref()
    }

    /// Parse one SDL `GameControllerDB` line (§4.2, §6.2). Returns `Ok(None)`
    /// for lines that are well-formed but don't target this process'
    /// platform (`platform:` field present and mismatched), and an error
    /// only for the hard-failure cases `update_gamepad_mappings` must
    /// reject (§7); parser-level field problems are logged and skipped
    /// rather than failing the whole line, per §4.2's "never aborts the
    /// whole import".
    pub fn parse(line: &str, this_platform: &str) -> Result<Option<Mapping>, MappingError> {
        let line = line.trim();
        if line.is_empty() || !line.as_bytes()[0].is_ascii_hexdigit() {
            return Ok(None);
        }

        let mut tok = Parser::new(line);
        let guid = match tok.next_token() {
            Some(Ok(Token::Guid(g))) => g,
            _ => return Ok(None),
        };
        if guid.len() != 32 || !guid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MappingError::InvalidGuid);
        }
        let name = match tok.next_token() {
            Some(Ok(Token::Name(n))) => n,
            _ => return Ok(None),
        };
        if name.is_empty() || name.len() >= 128 {
            return Err(MappingError::InvalidName);
        }

        let mut buttons: [Option<Element>; BUTTON_SLOTS] = Default::default();
        let mut axes: [Option<Element>; AXIS_SLOTS] = Default::default();
        let mut platform_ok = true;

        while let Some(result) = tok.next_token() {
            match result {
                Ok(Token::Platform(p)) => {
                    platform_ok = p.eq_ignore_ascii_case(this_platform);
                }
                Ok(Token::Field { name, binding, output_modifier }) => {
                    if let Some(slot) = button_field_index(name) {
                        buttons[slot] = Some(Self::element_from_binding(binding, output_modifier));
                    } else if let Some(slot) = axis_field_index(name) {
                        axes[slot] = Some(Self::element_from_binding(binding, output_modifier));
                    } else {
                        warn!("unrecognised mapping field '{name}', ignoring");
                    }
                }
                Ok(Token::Guid(_)) | Ok(Token::Name(_)) => {}
                Err(e) => warn!("malformed mapping field, ignoring: {e}"),
            }
        }

        if !platform_ok {
            return Ok(None);
        }

        let guid = normalize_guid(&guid.to_ascii_lowercase(), this_platform);

        let mut r_buttons = [Button::Unknown; 256];
        for (slot, element) in buttons.iter().enumerate() {
            let Some(element) = element else { continue };
            let (_, canonical) = SDL_BUTTON_FIELDS
                .get(slot)
                .copied()
                .unwrap_or(("", Button::Unknown));
            if element.kind == ElementKind::Button && (element.index as usize) < r_buttons.len() {
                r_buttons[element.index as usize] = canonical;
            }
        }

        let mut r_axes = [Axis::Unknown; AXIS_CODE_SPACE];
        for (slot, element) in axes.iter().enumerate() {
            let Some(element) = element else { continue };
            let (_, canonical) = SDL_AXIS_FIELDS.get(slot).copied().unwrap_or(("", Axis::Unknown));
            if element.kind == ElementKind::Axis && (element.index as usize) < r_axes.len() {
                r_axes[element.index as usize] = canonical;
            }
        }

        Ok(Some(Mapping {
            guid,
            name: name.to_string(),
            buttons,
            axes,
            r_buttons,
            r_axes,
        }))
    }

    fn element_from_binding(binding: Binding, output_modifier: Modifier) -> Element {
        match binding {
            Binding::Button { native_index } => Element::button(native_index as u8),
            Binding::Hat { hat, bit } => Element::hat_bit(hat, bit),
            Binding::Axis { native_index, inverted } => {
                Element::axis(native_index as u8, inverted, output_modifier)
            }
        }
    }
}

/// GUID platform normalization (§4.2 item 8). Some platforms report GUIDs
/// missing the version/bus fields SDL's convention expects; this rewrites
/// them into the canonical `03000000<vid>0000<pid>000000000000` shape so
/// they line up with entries in the bundled database.
fn normalize_guid(guid: &str, this_platform: &str) -> String {
    if this_platform.eq_ignore_ascii_case("Mac OS X") {
        let zeros_a = &guid[4..16];
        let zeros_b = &guid[20..32];
        if zeros_a.bytes().all(|b| b == b'0') && zeros_b.bytes().all(|b| b == b'0') {
            return format!("03000000{}0000{}000000000000", &guid[0..4], &guid[16..20]);
        }
    } else if this_platform.eq_ignore_ascii_case("Windows") && &guid[20..32] == "504944564944" {
        return format!("03000000{}0000{}000000000000", &guid[0..4], &guid[16..20]);
    }
    guid.to_string()
}

/// Process-wide collection of known mappings, keyed by GUID (§3.5:
/// "mappings live in a fixed-size array... owned by a process-wide
/// singleton"). We use a growable `Vec` rather than a literal fixed array —
/// there is no meaningful upper bound to enforce in a library that also
/// accepts caller-supplied mappings at runtime — but reserve the spec's
/// stated capacity up front so normal use never reallocates.
pub struct MappingDb {
    mappings: Vec<Mapping>,
    exact_index: FnvHashMap<String, usize>,
    this_platform: &'static str,
}

/// Default bundled database capacity hint (§3.5).
const MAPPING_DB_CAPACITY_HINT: usize = 1300;

impl MappingDb {
    pub fn new() -> Self {
        MappingDb {
            mappings: Vec::with_capacity(MAPPING_DB_CAPACITY_HINT),
            exact_index: FnvHashMap::default(),
            this_platform: current_platform_name(),
        }
    }

    /// Loads the bundled `assets/gamecontrollerdb.txt` slice (§6.2, §B).
    pub fn with_bundled_mappings() -> Self {
        let mut db = Self::new();
        db.add_mappings_text(include_str!("../../assets/gamecontrollerdb.txt"));
        db
    }

    /// Parses `SDL_GAMECONTROLLERCONFIG`, if set, as additional mapping
    /// lines (§A.3).
    pub fn add_env_mappings(&mut self) {
        if let Ok(text) = std::env::var("SDL_GAMECONTROLLERCONFIG") {
            self.add_mappings_text(&text);
        }
    }

    pub fn add_mappings_text(&mut self, text: &str) -> usize {
        let mut added = 0;
        for line in text.lines() {
            match self.add_mapping_line(line) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!("skipping mapping line: {e}"),
            }
        }
        added
    }

    /// Parses and inserts one mapping line. Returns `Ok(false)` for blank,
    /// comment-like, or platform-mismatched lines (not an error, just not
    /// applicable here).
    pub fn add_mapping_line(&mut self, line: &str) -> Result<bool, MappingError> {
        match Mapping::parse(line, self.this_platform)? {
            Some(mapping) => {
                self.insert(mapping);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert(&mut self, mapping: Mapping) {
        let guid = mapping.guid.clone();
        let idx = self.mappings.len();
        debug!("registered mapping for guid {guid} ({})", mapping.name);
        self.mappings.push(mapping);
        self.exact_index.entry(guid).or_insert(idx);
    }

    /// Exact 32-char GUID match (§4.2: `findMapping`).
    pub fn find_mapping(&self, guid: &str) -> Option<&Mapping> {
        self.exact_index.get(guid).map(|&i| &self.mappings[i])
    }

    /// First-24-char GUID match, ignoring the version suffix (§4.2:
    /// `findMappingPermissive`). Linear scan, as specified.
    pub fn find_mapping_permissive(&self, guid: &str) -> Option<&Mapping> {
        if guid.len() < 24 {
            return None;
        }
        let prefix = &guid[..24];
        self.mappings.iter().find(|m| m.guid.len() >= 24 && &m.guid[..24] == prefix)
    }

    /// Two-tier resolution used when a gamepad connects (§4.4): exact
    /// match, then permissive match.
    pub fn resolve(&self, guid: &str) -> Option<&Mapping> {
        self.find_mapping(guid).or_else(|| self.find_mapping_permissive(guid))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for MappingDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn current_platform_name() -> &'static str {
    "Linux"
}

#[cfg(target_os = "windows")]
fn current_platform_name() -> &'static str {
    "Windows"
}

#[cfg(target_os = "macos")]
fn current_platform_name() -> &'static str {
    "Mac OS X"
}

#[cfg(target_arch = "wasm32")]
fn current_platform_name() -> &'static str {
    "Web"
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "windows",
    target_os = "macos",
    target_arch = "wasm32"
)))]
fn current_platform_name() -> &'static str {
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    const XBOX360_GUID: &str = "030000005e0400008e02000014010000";
    const XBOX360_LINE: &str = "030000005e0400008e02000014010000,Xbox 360 Controller,a:b0,b:b1,x:b2,y:b3,back:b6,start:b7,leftshoulder:b4,rightshoulder:b5,leftstick:b9,rightstick:b10,dpup:h0.1,dpdown:h0.4,dpleft:h0.8,dpright:h0.2,leftx:a0,lefty:a1,rightx:a3,righty:a4,lefttrigger:a2,righttrigger:a5,platform:Linux,";

    #[test]
    fn parses_and_resolves_exact() {
        let mut db = MappingDb::new();
        db.this_platform = "Linux";
        assert!(db.add_mapping_line(XBOX360_LINE).unwrap());
        let m = db.find_mapping(XBOX360_GUID).expect("exact match");
        assert_eq!(m.translate_button(0), Button::South);
        assert_eq!(m.translate_button(1), Button::East);
        assert_eq!(m.translate_axis(0), Axis::LeftX);
    }

    #[test]
    fn permissive_match_ignores_version_suffix() {
        let mut db = MappingDb::new();
        db.this_platform = "Linux";
        db.add_mapping_line(XBOX360_LINE).unwrap();
        let variant_guid = "030000005e0400008e02000030060000";
        assert!(db.find_mapping(variant_guid).is_none());
        assert!(db.find_mapping_permissive(variant_guid).is_some());
    }

    #[test]
    fn rejects_bad_guid_length() {
        let mut db = MappingDb::new();
        let err = db.add_mapping_line("deadbeef,Short GUID,a:b0,").unwrap_err();
        assert_eq!(err, MappingError::InvalidGuid);
    }

    #[test]
    fn skips_line_for_other_platform() {
        let mut db = MappingDb::new();
        db.this_platform = "Windows";
        assert!(!db.add_mapping_line(XBOX360_LINE).unwrap());
        assert!(db.is_empty());
    }

    #[test]
    fn full_axis_normalizes_endpoints_to_unit_range() {
        let el = Element::axis(0, false, Modifier::None);
        assert!((el.normalize(NATIVE_AXIS_MAX) - 1.0).abs() < 0.001);
        assert!((el.normalize(NATIVE_AXIS_MIN) - -1.0).abs() < 0.001);
        assert!(el.normalize(0).abs() < 0.01);
    }

    #[test]
    fn positive_modifier_clamps_to_zero_one() {
        let el = Element::axis(2, false, Modifier::Positive);
        assert!((el.normalize(NATIVE_AXIS_MAX) - 1.0).abs() < 0.001);
        assert!((el.normalize(0) - 0.0).abs() < 0.001);
    }

    #[test]
    fn guid_normalization_rewrites_macos_zero_padded_guid() {
        let padded = "0400000000000000000003000000";
        let _ = padded;
        let guid = "04000000000009200000030000000000";
        let normalized = normalize_guid(guid, "Mac OS X");
        assert!(normalized.starts_with("03000000"));
    }

    #[test]
    fn round_trips_forward_and_reverse_tables() {
        let mapping = Mapping::parse(XBOX360_LINE, "Linux").unwrap().unwrap();
        let element = mapping.element_for_button(Button::South).unwrap();
        assert_eq!(mapping.translate_button(element.index), Button::South);
        let axis_element = mapping.element_for_axis(Axis::LeftX).unwrap();
        assert_eq!(mapping.translate_axis(axis_element.index as usize), Axis::LeftX);
    }
}
