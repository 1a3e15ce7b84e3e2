//! Event records, the bounded event queue, and the five process-global
//! callback slots (§3.6, §4.3).

use std::fmt::{self, Display, Formatter};

use crate::model::{Axis, Button};

/// A gamepad handle as carried by an [`Event`]. Events reference a gamepad
/// by its stable container index rather than by value — per §3.6, "the
/// consumer must read the referenced gamepad's state field", so an event is
/// only meaningful while the slot it names is still connected.
pub type GamepadId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    Connect,
    Disconnect,
    ButtonPress,
    ButtonRelease,
    AxisMove,
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::Connect => "Connect",
            EventType::Disconnect => "Disconnect",
            EventType::ButtonPress => "ButtonPress",
            EventType::ButtonRelease => "ButtonRelease",
            EventType::AxisMove => "AxisMove",
        };
        f.write_str(s)
    }
}

/// One queued or dispatched occurrence (§3.6). `button`/`axis` are
/// `Unknown` when not applicable to this event's `kind`; no value/state is
/// carried — read it back off the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub kind: EventType,
    pub gamepad: GamepadId,
    pub button: Button,
    pub axis: Axis,
}

impl Event {
    pub(crate) fn connection(gamepad: GamepadId, connected: bool) -> Self {
        Event {
            kind: if connected { EventType::Connect } else { EventType::Disconnect },
            gamepad,
            button: Button::Unknown,
            axis: Axis::Unknown,
        }
    }

    pub(crate) fn button(gamepad: GamepadId, button: Button, pressed: bool) -> Self {
        Event {
            kind: if pressed { EventType::ButtonPress } else { EventType::ButtonRelease },
            gamepad,
            button,
            axis: Axis::Unknown,
        }
    }

    pub(crate) fn axis(gamepad: GamepadId, axis: Axis) -> Self {
        Event {
            kind: EventType::AxisMove,
            gamepad,
            button: Button::Unknown,
            axis,
        }
    }
}

/// Fixed-capacity event queue (§3.6 / §4.3 item 5, §8.1 invariant 7).
///
/// The source this was distilled from fills and drains this as a stack
/// (`queue[MG_MAX_EVENTS - len]`), which delivers events in reverse arrival
/// order within a frame — flagged in the spec as almost certainly an
/// unintentional bug, since nothing in the public contract depends on LIFO
/// order and both the API name (`check_queued_event`) and the type name
/// say "queue". This implementation is a true ring buffer: FIFO order,
/// same bounded capacity, same "drop silently when full" behavior.
pub struct EventQueue<const E: usize> {
    buf: [Option<Event>; E],
    head: usize,
    len: usize,
}

impl<const E: usize> EventQueue<E> {
    pub fn new() -> Self {
        EventQueue {
            buf: [None; E],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == E
    }

    /// Returns `false` (and drops the event) if the queue is full.
    pub fn push(&mut self, event: Event) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.len) % E;
        self.buf[tail] = Some(event);
        self.len += 1;
        true
    }

    /// Pops the oldest queued event. A no-op returning `None` when empty
    /// (§8.1 invariant 7).
    pub fn pop(&mut self) -> Option<Event> {
        if self.len == 0 {
            return None;
        }
        let event = self.buf[self.head].take();
        self.head = (self.head + 1) % E;
        self.len -= 1;
        event
    }

    pub fn clear(&mut self) {
        self.buf = [None; E];
        self.head = 0;
        self.len = 0;
    }
}

impl<const E: usize> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ConnectFn = fn(GamepadId);
pub type DisconnectFn = fn(GamepadId);
pub type PressFn = fn(GamepadId, Button);
pub type ReleaseFn = fn(GamepadId, Button);
pub type AxisMoveFn = fn(GamepadId, Axis, f32);

/// The five process-global callback slots (§4.3 item 3, §5 "shared-resource
/// policy", §6.1 `set_*_callback`). Each may be unset; `handle_event` skips
/// a null slot and continues the pipeline (§7).
#[derive(Default)]
pub struct Callbacks {
    pub connect: Option<ConnectFn>,
    pub disconnect: Option<DisconnectFn>,
    pub press: Option<PressFn>,
    pub release: Option<ReleaseFn>,
    pub axis_move: Option<AxisMoveFn>,
}

impl Callbacks {
    pub fn set_connect(&mut self, f: Option<ConnectFn>) -> Option<ConnectFn> {
        std::mem::replace(&mut self.connect, f)
    }

    pub fn set_disconnect(&mut self, f: Option<DisconnectFn>) -> Option<DisconnectFn> {
        std::mem::replace(&mut self.disconnect, f)
    }

    pub fn set_press(&mut self, f: Option<PressFn>) -> Option<PressFn> {
        std::mem::replace(&mut self.press, f)
    }

    pub fn set_release(&mut self, f: Option<ReleaseFn>) -> Option<ReleaseFn> {
        std::mem::replace(&mut self.release, f)
    }

    pub fn set_axis_move(&mut self, f: Option<AxisMoveFn>) -> Option<AxisMoveFn> {
        std::mem::replace(&mut self.axis_move, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(n: usize) -> Event {
        Event::button(n, Button::South, true)
    }

    #[test]
    fn fifo_order() {
        let mut q: EventQueue<4> = EventQueue::new();
        assert!(q.push(ev(1)));
        assert!(q.push(ev(2)));
        assert_eq!(q.pop().unwrap().gamepad, 1);
        assert_eq!(q.pop().unwrap().gamepad, 2);
        assert!(q.pop().is_none());
    }

    #[test]
    fn drops_silently_when_full() {
        let mut q: EventQueue<2> = EventQueue::new();
        assert!(q.push(ev(1)));
        assert!(q.push(ev(2)));
        assert!(!q.push(ev(3)));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().gamepad, 1);
    }

    #[test]
    fn pop_on_empty_is_noop() {
        let mut q: EventQueue<4> = EventQueue::new();
        assert!(q.pop().is_none());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn set_callback_returns_previous() {
        fn a(_: GamepadId) {}
        fn b(_: GamepadId) {}
        let mut cb = Callbacks::default();
        assert_eq!(cb.set_connect(Some(a)), None);
        let prev = cb.set_connect(Some(b));
        assert!(prev.is_some());
        let prev2 = cb.set_connect(None);
        assert!(prev2.is_some());
    }
}
