//! Domain events published by the engine.
//!
//! Delivery is the notifier's concern; the engine only hands events to a
//! sink. The default sink drops them.

use serde::Serialize;

use crate::task::Assignee;

/// Something the surrounding application may want to notify about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCompleted {
        task_id: String,
        project_id: String,
        actor_id: String,
    },
    TaskAssigned {
        task_id: String,
        project_id: String,
        assignee: Assignee,
    },
}

/// Receiver for engine events.
pub trait EventSink {
    fn publish(&mut self, event: DomainEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: DomainEvent) {}
}

/// Sink that keeps events in memory, mainly for tests and batch forwarding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<DomainEvent>,
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

/// Lets a caller keep a handle on a sink it has handed to the engine.
impl<T: EventSink> EventSink for std::rc::Rc<std::cell::RefCell<T>> {
    fn publish(&mut self, event: DomainEvent) {
        self.borrow_mut().publish(event);
    }
}
