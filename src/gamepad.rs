//! The device registry (§4.1) and the public [`Gamepads`] container that
//! ties the registry, mapping DB, event pipeline, and platform backend
//! together.

use log::{debug, info, warn};

use crate::event::{Callbacks, Event, EventQueue};
use crate::mapping::MappingDb;
use crate::model::{self, Axis, AxisState, Button, ButtonState};
use crate::platform::{self, PlatformBackend};

/// Where a gamepad's current button/axis translation came from (§B). Purely
/// diagnostic — doesn't change behavior, just lets an application explain
/// why an unusual device isn't translating the way it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    /// No mapping resolved at all; every input fell through to the
    /// backend's hardcoded fallback table (or was dropped).
    None,
    /// Matched the mapping DB by GUID (exact or permissive).
    MappingDb,
    /// No DB match; the backend's `get_button_platform`/`get_axis_platform`
    /// fallback table was used for every input.
    PlatformFallback,
}

/// One registered gamepad (§3.3). Lives inside a [`Gamepads`] container for
/// the container's lifetime; never individually heap-allocated.
pub struct Gamepad {
    index: usize,
    name: String,
    guid: String,
    connected: bool,
    mapping_source: MappingSource,
    buttons: [ButtonState; model::BUTTON_COUNT],
    axes: [AxisState; model::AXIS_COUNT],
    pub(crate) substate: platform::Substate,
}

impl Gamepad {
    fn empty(index: usize) -> Self {
        Gamepad {
            index,
            name: String::new(),
            guid: String::new(),
            connected: false,
            mapping_source: MappingSource::None,
            buttons: [ButtonState::default(); model::BUTTON_COUNT],
            axes: std::array::from_fn(|i| AxisState {
                supported: false,
                value: 0.0,
                deadzone: Axis::from_index(i).default_deadzone(),
            }),
            substate: platform::Substate::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 32 lowercase hex digits (§6.3); empty for a disconnected slot.
    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn mapping_source(&self) -> MappingSource {
        self.mapping_source
    }

    pub fn button_is_pressed(&self, button: Button) -> bool {
        button.index().map(|i| self.buttons[i].is_pressed()).unwrap_or(false)
    }

    pub fn button_is_released(&self, button: Button) -> bool {
        button.index().map(|i| self.buttons[i].is_released()).unwrap_or(false)
    }

    pub fn button_is_down(&self, button: Button) -> bool {
        button.index().map(|i| self.buttons[i].is_down()).unwrap_or(false)
    }

    pub fn button_is_supported(&self, button: Button) -> bool {
        button.index().map(|i| self.buttons[i].supported).unwrap_or(false)
    }

    pub fn axis_value(&self, axis: Axis) -> f32 {
        axis.index().map(|i| self.axes[i].value).unwrap_or(0.0)
    }

    pub fn axis_is_supported(&self, axis: Axis) -> bool {
        axis.index().map(|i| self.axes[i].supported).unwrap_or(false)
    }

    pub fn axis_deadzone(&self, axis: Axis) -> f32 {
        axis.index().map(|i| self.axes[i].deadzone).unwrap_or(0.0)
    }

    pub(crate) fn set_button_supported(&mut self, button: Button, supported: bool) {
        if let Some(i) = button.index() {
            self.buttons[i].supported = supported;
        }
    }

    pub(crate) fn set_axis_supported(&mut self, axis: Axis, supported: bool, deadzone: f32) {
        if let Some(i) = axis.index() {
            self.axes[i].supported = supported;
            self.axes[i].deadzone = deadzone;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

/// A doubly-linked list of slot indices over a shared `Link` array. `tail`
/// is what the spec calls `current` (§3.1): the most recently appended
/// node, i.e. where the next `push_tail` or `pop_tail` acts.
#[derive(Debug, Default)]
struct ListPos {
    head: Option<usize>,
    tail: Option<usize>,
    count: usize,
}

fn list_pop_tail(links: &mut [Link], list: &mut ListPos) -> Option<usize> {
    let idx = list.tail?;
    let prev = links[idx].prev;
    match prev {
        Some(p) => links[p].next = None,
        None => list.head = None,
    }
    list.tail = prev;
    list.count -= 1;
    links[idx] = Link::default();
    Some(idx)
}

fn list_push_tail(links: &mut [Link], list: &mut ListPos, idx: usize) {
    links[idx] = Link {
        prev: list.tail,
        next: None,
    };
    match list.tail {
        Some(t) => links[t].next = Some(idx),
        None => list.head = Some(idx),
    }
    list.tail = Some(idx);
    list.count += 1;
}

fn list_unlink(links: &mut [Link], list: &mut ListPos, idx: usize) {
    let prev = links[idx].prev;
    let next = links[idx].next;
    match prev {
        Some(p) => links[p].next = next,
        None => list.head = next,
    }
    match next {
        Some(n) => links[n].prev = prev,
        None => list.tail = prev,
    }
    list.count -= 1;
    links[idx] = Link::default();
}

/// Fixed-capacity gamepad container: the device registry, mapping DB, event
/// pipeline, and the active platform backend, bundled the way an
/// application actually uses this library (§3.1, §5's "one container per
/// process").
///
/// `N` is the max simultaneously connected gamepads (default 4); `E` is the
/// max queued events (default 32). Both are compile-time, per §6.1 — see
/// the [`Gamepads`](crate::Gamepads) (capital, type alias) default.
pub struct Gamepads<const N: usize, const E: usize> {
    slots: [Gamepad; N],
    links: [Link; N],
    free_list: ListPos,
    active_list: ListPos,
    queue: EventQueue<E>,
    queue_events: bool,
    polled_events: bool,
    callbacks: Callbacks,
    mapping_db: MappingDb,
    backend: platform::Backend,
    last_platform_error: Option<crate::error::PlatformError>,
}

impl<const N: usize, const E: usize> Gamepads<N, E> {
    /// `gamepads_init` (§6.1): builds the free list, loads the bundled
    /// mapping database plus any `SDL_GAMECONTROLLERCONFIG` entries, and
    /// brings up the platform backend (enumerating already-connected
    /// devices and registering them).
    pub fn new() -> Self {
        let mut links = [Link::default(); N];
        let mut free_list = ListPos::default();
        for i in 0..N {
            list_push_tail(&mut links, &mut free_list, i);
        }

        let mut mapping_db = MappingDb::with_bundled_mappings();
        mapping_db.add_env_mappings();

        let mut container = Gamepads {
            slots: std::array::from_fn(Gamepad::empty),
            links,
            free_list,
            active_list: ListPos::default(),
            queue: EventQueue::new(),
            queue_events: false,
            polled_events: false,
            callbacks: Callbacks::default(),
            mapping_db,
            backend: platform::Backend::default(),
            last_platform_error: None,
        };

        let mut backend = std::mem::take(&mut container.backend);
        backend.init_platform(&mut container);
        container.backend = backend;
        container
    }

    // ---- Device registry (§4.1) ----

    /// Allocates a free slot and moves it to the active list, or `None` if
    /// every slot is occupied ("too many connected gamepads", §4.1).
    pub(crate) fn find(&mut self) -> Option<usize> {
        let idx = list_pop_tail(&mut self.links, &mut self.free_list)?;
        list_push_tail(&mut self.links, &mut self.active_list, idx);
        self.slots[idx] = Gamepad::empty(idx);
        Some(idx)
    }

    /// Releases an active slot back to the free list.
    pub(crate) fn release(&mut self, idx: usize) {
        self.backend.release_platform(&mut self.slots[idx]);
        list_unlink(&mut self.links, &mut self.active_list, idx);
        list_push_tail(&mut self.links, &mut self.free_list, idx);
        self.slots[idx] = Gamepad::empty(idx);
    }

    /// Snapshot of `active_list` traversal order into a fixed-capacity
    /// buffer (no heap allocation, per §5's arena discipline) so callers
    /// can mutate `self` per gamepad without holding the list borrow open.
    fn active_indices(&self) -> ([usize; N], usize) {
        let mut buf = [0usize; N];
        let mut count = 0;
        let mut cur = self.active_list.head;
        while let Some(i) = cur {
            buf[count] = i;
            count += 1;
            cur = self.links[i].next;
        }
        (buf, count)
    }

    // ---- Connection lifecycle (called by platform backends) ----

    /// Registers a newly discovered device, resolves its mapping, and
    /// dispatches a `Connect` event. Returns the new slot index, or `None`
    /// if the container is full (the backend must then ignore the
    /// discovery, per §4.1's failure semantics).
    pub(crate) fn handle_connect(&mut self, guid: String, name: String, substate: platform::Substate) -> Option<usize> {
        let idx = self.find()?;
        let mapping = self.mapping_db.resolve(&guid);
        let mapping_source = if mapping.is_some() {
            MappingSource::MappingDb
        } else {
            MappingSource::PlatformFallback
        };
        let gamepad = &mut self.slots[idx];
        gamepad.guid = guid;
        gamepad.name = name;
        gamepad.substate = substate;
        gamepad.connected = true;
        gamepad.mapping_source = mapping_source;
        info!("gamepad {idx} connected: {} ({})", gamepad.name, gamepad.guid);
        self.dispatch_connect(idx, true);
        Some(idx)
    }

    /// Dispatches a `Disconnect` event then releases the slot.
    pub(crate) fn handle_disconnect(&mut self, idx: usize) {
        self.dispatch_connect(idx, false);
        self.release(idx);
    }

    pub(crate) fn mapping_db(&self) -> &MappingDb {
        &self.mapping_db
    }

    /// Records a backend init failure (§7: "tolerated" — the container
    /// keeps running with zero discovered devices — but still worth
    /// surfacing the typed error for diagnostics/logging, per SPEC_FULL
    /// §A.2).
    pub(crate) fn record_platform_error(&mut self, err: crate::error::PlatformError) {
        warn!("platform backend failed to initialize: {err}");
        self.last_platform_error = Some(err);
    }

    /// The most recent backend initialization failure, if any. `None` means
    /// either the backend came up cleanly or hasn't failed yet.
    pub fn last_platform_error(&self) -> Option<&crate::error::PlatformError> {
        self.last_platform_error.as_ref()
    }

    pub(crate) fn gamepad_mut(&mut self, idx: usize) -> &mut Gamepad {
        &mut self.slots[idx]
    }

    // ---- Event pipeline (§4.3) ----

    fn dispatch_connect(&mut self, idx: usize, connected: bool) {
        if connected {
            if let Some(f) = self.callbacks.connect {
                f(idx);
            }
        } else if let Some(f) = self.callbacks.disconnect {
            f(idx);
        }
        if self.queue_events {
            let dropped = !self.queue.push(Event::connection(idx, connected));
            if dropped {
                warn!("event queue full, dropping connection event for gamepad {idx}");
            }
        }
    }

    /// `handle_event` for a button (§4.3 items 1-5), specialized to the
    /// button case: validate (drop if unchanged), classify, callback,
    /// commit, enqueue.
    pub(crate) fn dispatch_button(&mut self, idx: usize, button: Button, pressed: bool) {
        let Some(bi) = button.index() else { return };
        if self.slots[idx].buttons[bi].current == pressed {
            return;
        }
        if pressed {
            if let Some(f) = self.callbacks.press {
                f(idx, button);
            }
        } else if let Some(f) = self.callbacks.release {
            f(idx, button);
        }
        self.slots[idx].buttons[bi].commit(pressed);
        if self.queue_events {
            let dropped = !self.queue.push(Event::button(idx, button, pressed));
            if dropped {
                warn!("event queue full, dropping button event for gamepad {idx}");
            }
        }
    }

    /// `handle_event` for an axis, same shape as [`Self::dispatch_button`].
    pub(crate) fn dispatch_axis(&mut self, idx: usize, axis: Axis, value: f32) {
        let Some(ai) = axis.index() else { return };
        let value = model::apply_deadzone(value, self.slots[idx].axes[ai].deadzone);
        if self.slots[idx].axes[ai].value == value {
            return;
        }
        if let Some(f) = self.callbacks.axis_move {
            f(idx, axis, value);
        }
        self.slots[idx].axes[ai].commit(value);
        if self.queue_events {
            let dropped = !self.queue.push(Event::axis(idx, axis));
            if dropped {
                warn!("event queue full, dropping axis event for gamepad {idx}");
            }
        }
    }

    /// `gamepads_set_queue_events` (§4.3): when disabled, `poll` still
    /// updates state and fires callbacks, it just stops enqueuing.
    pub fn set_queue_events(&mut self, enabled: bool) {
        self.queue_events = enabled;
    }

    /// `gamepads_poll` (§4.3): backend hot-plug drain, then per-gamepad
    /// input read, in `active_list` order. Returns `true` if any event was
    /// handled this cycle.
    pub fn poll(&mut self) -> bool {
        let mut any = false;
        let mut backend = std::mem::take(&mut self.backend);
        any |= backend.poll_platform(self);
        let (buf, count) = self.active_indices();
        for &idx in &buf[..count] {
            any |= backend.update_platform(self, idx);
        }
        self.backend = backend;
        any
    }

    /// `gamepads_check_queued_event` (§4.3): pops without polling.
    pub fn check_queued_event(&mut self) -> Option<Event> {
        self.polled_events = true;
        self.queue.pop()
    }

    /// `gamepads_check_event` (§4.3): "pump until drained, then refill."
    pub fn check_event(&mut self) -> Option<Event> {
        if self.queue.is_empty() && !self.polled_events {
            self.queue_events = true;
            self.poll();
        }
        self.polled_events = true;
        let event = self.queue.pop();
        if self.queue.is_empty() {
            self.polled_events = false;
        }
        event
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // ---- Accessors ----

    pub fn gamepad(&self, idx: usize) -> Option<&Gamepad> {
        self.slots.get(idx).filter(|g| g.connected)
    }

    /// Active gamepads in discovery order (`active_list` order, §5).
    pub fn iter(&self) -> impl Iterator<Item = &Gamepad> + '_ {
        let (buf, count) = self.active_indices();
        (0..count).map(move |i| &self.slots[buf[i]])
    }

    pub fn active_count(&self) -> usize {
        self.active_list.count
    }

    pub fn free_count(&self) -> usize {
        self.free_list.count
    }

    pub fn set_connect_callback(&mut self, f: Option<crate::event::ConnectFn>) -> Option<crate::event::ConnectFn> {
        self.callbacks.set_connect(f)
    }

    pub fn set_disconnect_callback(&mut self, f: Option<crate::event::DisconnectFn>) -> Option<crate::event::DisconnectFn> {
        self.callbacks.set_disconnect(f)
    }

    pub fn set_press_callback(&mut self, f: Option<crate::event::PressFn>) -> Option<crate::event::PressFn> {
        self.callbacks.set_press(f)
    }

    pub fn set_release_callback(&mut self, f: Option<crate::event::ReleaseFn>) -> Option<crate::event::ReleaseFn> {
        self.callbacks.set_release(f)
    }

    pub fn set_axis_move_callback(&mut self, f: Option<crate::event::AxisMoveFn>) -> Option<crate::event::AxisMoveFn> {
        self.callbacks.set_axis_move(f)
    }

    /// `update_gamepad_mappings` (§6.1): parses and inserts `mapping_text`,
    /// then re-resolves every active gamepad's mapping against the updated
    /// DB (`find_valid_mapping` re-run, §4.2).
    pub fn update_gamepad_mappings(&mut self, mapping_text: &str) -> bool {
        let added = self.mapping_db.add_mappings_text(mapping_text);
        let (buf, count) = self.active_indices();
        for &idx in &buf[..count] {
            let guid = self.slots[idx].guid.clone();
            let source = if self.mapping_db.resolve(&guid).is_some() {
                MappingSource::MappingDb
            } else {
                MappingSource::PlatformFallback
            };
            self.slots[idx].mapping_source = source;
            debug!("re-resolved mapping for gamepad {idx}: {source:?}");
        }
        added > 0
    }
}

impl std::fmt::Debug for MappingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MappingSource::None => "None",
            MappingSource::MappingDb => "MappingDb",
            MappingSource::PlatformFallback => "PlatformFallback",
        };
        f.write_str(s)
    }
}

impl<const N: usize, const E: usize> Default for Gamepads<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const E: usize> Drop for Gamepads<N, E> {
    /// `gamepads_free` (§6.1): tear down the backend. Per §4.4,
    /// `free_platform` itself doesn't release per-gamepad state; dropping
    /// the container drops every slot along with it.
    fn drop(&mut self) {
        self.backend.free_platform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bypasses backend init (which touches real OS resources) to keep
    /// registry/pipeline unit tests hermetic and OS-independent.
    fn fresh<const N: usize, const E: usize>() -> Gamepads<N, E> {
        let mut links = [Link::default(); N];
        let mut free_list = ListPos::default();
        for i in 0..N {
            list_push_tail(&mut links, &mut free_list, i);
        }
        Gamepads {
            slots: std::array::from_fn(Gamepad::empty),
            links,
            free_list,
            active_list: ListPos::default(),
            queue: EventQueue::new(),
            queue_events: true,
            polled_events: false,
            callbacks: Callbacks::default(),
            mapping_db: MappingDb::new(),
            backend: Default::default(),
            last_platform_error: None,
        }
    }

    #[test]
    fn invariant_counts_sum_to_capacity() {
        let mut g: Gamepads<4, 8> = fresh();
        assert_eq!(g.free_count() + g.active_count(), 4);
        let a = g.find().unwrap();
        let _b = g.find().unwrap();
        assert_eq!(g.free_count() + g.active_count(), 4);
        g.release(a);
        assert_eq!(g.free_count() + g.active_count(), 4);
    }

    #[test]
    fn find_fails_when_exhausted() {
        let mut g: Gamepads<4, 8> = fresh();
        for _ in 0..4 {
            assert!(g.find().is_some());
        }
        assert!(g.find().is_none());
    }

    #[test]
    fn release_returns_slot_to_free_list() {
        let mut g: Gamepads<4, 8> = fresh();
        let idx = g.find().unwrap();
        assert_eq!(g.active_count(), 1);
        g.release(idx);
        assert_eq!(g.active_count(), 0);
        assert_eq!(g.free_count(), 4);
    }

    #[test]
    fn s1_linux_xbox_button_press_via_mapping() {
        let mut g: Gamepads<4, 8> = fresh();
        let idx = g
            .handle_connect(
                "030000005e0400008e02000014010000".to_string(),
                "Xbox 360 Controller".to_string(),
                Default::default(),
            )
            .unwrap();
        g.mapping_db.add_mapping_line(
            "030000005e0400008e02000014010000,Xbox 360 Controller,a:b0,platform:Linux,",
        ).ok();
        // connect already happened against the (then-empty) db; simulate a
        // fresh resolve the way update_gamepad_mappings would.
        g.update_gamepad_mappings("");
        g.dispatch_button(idx, Button::South, true);
        assert!(g.gamepad(idx).unwrap().button_is_pressed(Button::South));
        assert!(!g.gamepad(idx).unwrap().button_is_released(Button::South));
        assert_eq!(g.queue.pop().unwrap().kind, crate::event::EventType::ButtonPress);
    }

    #[test]
    fn s2_deadzone_suppresses_small_axis_move() {
        let mut g: Gamepads<4, 8> = fresh();
        let idx = g.handle_connect("0".repeat(32), "Pad".into(), Default::default()).unwrap();
        g.gamepad_mut(idx).set_axis_supported(Axis::LeftX, true, 0.15);
        g.dispatch_axis(idx, Axis::LeftX, 0.05);
        assert_eq!(g.gamepad(idx).unwrap().axis_value(Axis::LeftX), 0.0);
        assert!(g.queue.is_empty());
    }

    #[test]
    fn duplicate_state_is_dropped_silently() {
        let mut g = fresh();
        let idx = g.handle_connect("a".repeat(32), "Pad".into(), Default::default()).unwrap();
        g.dispatch_button(idx, Button::South, true);
        let len_before = g.queue.len();
        g.dispatch_button(idx, Button::South, true);
        assert_eq!(g.queue.len(), len_before);
    }

    #[test]
    fn queue_overflow_drops_new_events_fifo_order_preserved() {
        let mut g: Gamepads<4, 4> = fresh();
        let idx = g.handle_connect("b".repeat(32), "Pad".into(), Default::default()).unwrap();
        // Connect already queued one event; five button presses follow, so
        // with capacity 4 the last two are dropped (queue: Connect, South,
        // East, West).
        let buttons = [Button::South, Button::East, Button::West, Button::North, Button::Back];
        for b in buttons {
            g.dispatch_button(idx, b, true);
        }
        assert_eq!(g.queue_len(), 4);
        // FIFO (§C resolution): the oldest surviving event pops first.
        let first = g.check_queued_event().unwrap();
        assert_eq!(first.kind, crate::event::EventType::Connect);
        let second = g.check_queued_event().unwrap();
        assert_eq!(second.button, Button::South);
    }
}
