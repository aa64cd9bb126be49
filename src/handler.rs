//! §4.4 — the handler/event subsystem: a bounded FIFO of channel
//! transitions, drained once per cycle against a table of small named
//! reaction records.

use crate::channel::ChannelStore;
use crate::error::PmuError;

pub const QUEUE_CAPACITY: usize = 64;
pub const MAX_HANDLERS: usize = 32;

/// What kind of transition an event records. The sampling layer and the
/// logic engine are the only producers (§5 ordering guarantees).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ChannelChanged,
    RisingEdge,
    FallingEdge,
    ThresholdCrossed,
    FaultRaised,
    FaultCleared,
    Custom(u8),
}

#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub kind: EventKind,
    pub channel_id: u16,
    pub value: i32,
}

/// Up to 15 bytes of application payload for an emitted frame — enough
/// for a classic CAN payload with a signal id prefix.
pub const MAX_FRAME_PAYLOAD: usize = 15;

#[derive(Debug, Clone)]
pub enum HandlerAction {
    WriteChannel { channel_id: u16, value: i32 },
    SetOutput { channel_id: u16, value: i32 },
    EmitFrame { frame_id: u16, payload: heapless::Vec<u8, MAX_FRAME_PAYLOAD> },
    InvokeScript { script_id: u16 },
}

/// One handler row: reacts to `(event_kind, source_channel)`, gated by an
/// optional condition channel (disabled when that channel reads 0).
#[derive(Debug, Clone)]
pub struct Handler {
    pub event_kind: EventKind,
    pub source_channel: u16,
    pub condition_channel: Option<u16>,
    pub action: HandlerAction,
}

/// Anything an emitted frame needs to reach its external sink; the sink
/// itself (CAN controller, UART) lives outside this crate.
pub trait FrameSink {
    fn emit(&mut self, frame_id: u16, payload: &[u8]);
}

/// Anything a scripted-function invocation needs; scripts are registered
/// and owned outside the core (§6.1 is silent on their representation).
pub trait ScriptSink {
    fn invoke(&mut self, script_id: u16);
}

#[derive(Default)]
pub struct HandlerSubsystem {
    queue: heapless::Deque<Event, QUEUE_CAPACITY>,
    handlers: heapless::Vec<Handler, MAX_HANDLERS>,
    pub dropped_events: u32,
}

impl HandlerSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Handler) -> Result<(), PmuError> {
        self.handlers.push(handler).map_err(|_| PmuError::EventQueueFull)
    }

    /// Pushes an event; silently counts and drops it if the queue is full
    /// rather than blocking the producer (sampling layer or logic engine).
    pub fn push(&mut self, event: Event) {
        if self.queue.push_back(event).is_err() {
            self.dropped_events += 1;
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drains the queue in FIFO order, running every handler whose
    /// `(event_kind, source_channel)` matches each dequeued event.
    pub fn drain(&mut self, store: &mut ChannelStore, frames: &mut impl FrameSink, scripts: &mut impl ScriptSink) {
        while let Some(event) = self.queue.pop_front() {
            for handler in self.handlers.iter() {
                if handler.event_kind != event.kind || handler.source_channel != event.channel_id {
                    continue;
                }
                if let Some(cond_id) = handler.condition_channel {
                    if store.get_value(cond_id) == 0 {
                        continue;
                    }
                }
                match &handler.action {
                    HandlerAction::WriteChannel { channel_id, value } => {
                        let _ = store.set_value(*channel_id, *value);
                    }
                    HandlerAction::SetOutput { channel_id, value } => {
                        let _ = store.set_value(*channel_id, *value);
                    }
                    HandlerAction::EmitFrame { frame_id, payload } => {
                        frames.emit(*frame_id, payload);
                    }
                    HandlerAction::InvokeScript { script_id } => {
                        scripts.invoke(*script_id);
                    }
                }
            }
        }
    }
}
