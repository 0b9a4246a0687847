//! Runtime event queue.
//!
//! Events are produced by:
//! - the scheduler delegate (hydration reminder, cycle check)
//! - the frame pump (one tick per analysed frame)
//! - the status timer
//!
//! Events are consumed by the runtime loop, which drains them in FIFO
//! order after each scheduler tick.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Scheduler   │────▶│              │     │              │
//! │ Frame pump  │────▶│  EventQueue  │────▶│ Runtime loop │
//! │ Status tick │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;
use log::warn;

use crate::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use crate::scheduler::{HYDRATION_WORK, PERIOD_CHECK_WORK};

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Runtime event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// A frame was pulled from the source.
    FrameTick = 0,
    /// The hydration reminder came due outside quiet hours.
    HydrationReminder = 10,
    /// The cycle check came due.
    PeriodCheck = 11,
    /// Periodic status snapshot timer fired.
    StatusTick = 30,
}

/// Bounded FIFO.  A push to a full queue drops the event.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Deque<Event, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&mut self, event: Event) -> bool {
        if self.events.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("EventQueue: full, dropped {:?}", event);
            return false;
        }
        true
    }

    /// Pop the next event.  `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Drain all pending events into a callback in FIFO order.
    pub fn drain(&mut self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events lost to a full queue since creation.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// The scheduler hands its fires straight to the queue.
impl SchedulerDelegate for EventQueue {
    fn on_schedule_fired(&mut self, name: &str, kind: ScheduleFiredKind) {
        if kind == ScheduleFiredKind::Suppressed {
            return;
        }
        let event = match name {
            HYDRATION_WORK => Event::HydrationReminder,
            PERIOD_CHECK_WORK => Event::PeriodCheck,
            other => {
                warn!("EventQueue: unknown schedule '{}'", other);
                return;
            }
        };
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = EventQueue::new();
        q.push(Event::PeriodCheck);
        q.push(Event::FrameTick);
        let mut seen = Vec::new();
        q.drain(|e| seen.push(e));
        assert_eq!(seen, vec![Event::PeriodCheck, Event::FrameTick]);
        assert!(q.is_empty());
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let mut q = EventQueue::new();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(q.push(Event::StatusTick));
        }
        assert!(!q.push(Event::HydrationReminder));
        assert_eq!(q.len(), EVENT_QUEUE_CAP);
        assert_eq!(q.dropped(), 1);
    }

    #[test]
    fn delegate_maps_schedule_names() {
        let mut q = EventQueue::new();
        q.on_schedule_fired(HYDRATION_WORK, ScheduleFiredKind::Periodic);
        q.on_schedule_fired(PERIOD_CHECK_WORK, ScheduleFiredKind::Periodic);
        q.on_schedule_fired(HYDRATION_WORK, ScheduleFiredKind::Suppressed);
        q.on_schedule_fired("mystery", ScheduleFiredKind::Periodic);
        assert_eq!(q.pop(), Some(Event::HydrationReminder));
        assert_eq!(q.pop(), Some(Event::PeriodCheck));
        assert_eq!(q.pop(), None);
    }
}
