//! Observation event queue.
//!
//! Hosts report visibility and dependency changes as [`ObservationEvent`]s
//! through a cloneable [`EventSender`]. The engine drains the queue at the
//! start of every tick, so events arriving mid-tick apply to the next one.

use std::sync::mpsc;

use crate::host::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationEvent {
    /// The element entered the visibility margin.
    BecameVisible(ElementId),
    /// The element left the visibility margin.
    BecameHidden(ElementId),
    /// A percentage basis element changed size or a layout attribute.
    DependencyChanged(ElementId),
}

/// Sending half handed to host observers.
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::Sender<ObservationEvent>,
}

impl EventSender {
    /// Returns `false` once the engine is gone.
    pub fn send(&self, event: ObservationEvent) -> bool {
        self.inner.send(event).is_ok()
    }

    pub fn became_visible(&self, element: ElementId) -> bool {
        self.send(ObservationEvent::BecameVisible(element))
    }

    pub fn became_hidden(&self, element: ElementId) -> bool {
        self.send(ObservationEvent::BecameHidden(element))
    }

    pub fn dependency_changed(&self, element: ElementId) -> bool {
        self.send(ObservationEvent::DependencyChanged(element))
    }
}

#[derive(Debug)]
pub(crate) struct EventQueue {
    sender: mpsc::Sender<ObservationEvent>,
    receiver: mpsc::Receiver<ObservationEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    pub(crate) fn sender(&self) -> EventSender {
        EventSender {
            inner: self.sender.clone(),
        }
    }

    pub(crate) fn push(&self, event: ObservationEvent) {
        // The receiver lives as long as the queue.
        let _ = self.sender.send(event);
    }

    pub(crate) fn try_next(&self) -> Option<ObservationEvent> {
        self.receiver.try_recv().ok()
    }
}
