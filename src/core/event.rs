//! Event identifiers and handler replies.
//!
//! Events are plain `u32` identifiers. The low range is reserved for the
//! engine (`ENTRY`, `EXIT`, ...); application events start at
//! [`Event::USER_BASE`].

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Opaque data delivered alongside an event or a transition.
///
/// Handlers recover the concrete type with [`payload_as`].
pub type Payload<'a> = Option<&'a dyn Any>;

/// Downcast a payload to a concrete type.
///
/// Returns `None` when no payload was supplied or it has another type.
pub fn payload_as<'a, T: Any>(payload: Payload<'a>) -> Option<&'a T> {
    payload.and_then(|data| data.downcast_ref::<T>())
}

/// Identifier of an event delivered to a state handler.
///
/// # Example
///
/// ```rust
/// use hsm_runtime::core::Event;
///
/// const BUTTON_PRESS: Event = Event::user(0);
///
/// assert_eq!(BUTTON_PRESS.raw(), 0x10);
/// assert!(!BUTTON_PRESS.is_reserved());
/// assert!(Event::ENTRY.is_reserved());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(u32);

impl Event {
    /// No event. Bubbling this value stops propagation.
    pub const NONE: Event = Event(0x00);

    /// Delivered by the transition engine when a state is entered.
    pub const ENTRY: Event = Event(0x01);

    /// Delivered by the transition engine when a state is exited.
    pub const EXIT: Event = Event(0x02);

    /// Generic timeout event, free for timers to use.
    pub const TIMEOUT: Event = Event(0x03);

    /// First identifier available to applications.
    pub const USER_BASE: u32 = 0x10;

    /// Wrap a raw identifier.
    pub const fn new(raw: u32) -> Self {
        Event(raw)
    }

    /// Application event `USER_BASE + offset`.
    pub const fn user(offset: u32) -> Self {
        Event(Self::USER_BASE + offset)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for identifiers below [`Event::USER_BASE`].
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::USER_BASE
    }

    /// True for events only the transition engine may deliver.
    pub(crate) const fn is_engine_only(self) -> bool {
        matches!(self.0, 0x00..=0x02)
    }
}

impl From<u32> for Event {
    fn from(raw: u32) -> Self {
        Event(raw)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("NONE"),
            Self::ENTRY => f.write_str("ENTRY"),
            Self::EXIT => f.write_str("EXIT"),
            Self::TIMEOUT => f.write_str("TIMEOUT"),
            Event(raw) if raw >= Self::USER_BASE => {
                write!(f, "USER+{}", raw - Self::USER_BASE)
            }
            Event(raw) => write!(f, "RESERVED({raw:#04x})"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a state handler did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// The event was consumed; stop bubbling.
    Handled,

    /// Pass this event (possibly rewritten) to the parent state.
    Bubble(Event),
}

impl Reply {
    /// Continue bubbling the event unchanged.
    pub const fn bubble(event: Event) -> Self {
        Reply::Bubble(event)
    }

    /// The event the dispatcher should pass upward, if any.
    pub(crate) fn forwarded(self) -> Option<Event> {
        match self {
            Reply::Handled => None,
            Reply::Bubble(event) if event == Event::NONE => None,
            Reply::Bubble(event) => Some(event),
        }
    }
}
