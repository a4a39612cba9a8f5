#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in osup
//!
//! Library crates never print or log directly. They emit typed events over an
//! unbounded channel and the CLI turns them into `tracing` records.

pub mod meta;
pub use meta::{EventLevel, EventSource};

pub mod events;
pub use events::{
    AppEvent, FailureContext, FetchEvent, GeneralEvent, InstallEvent, ProgressEvent,
    ProgressUnit,
};

use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub type EventSender = UnboundedSender<AppEvent>;
pub type EventReceiver = UnboundedReceiver<AppEvent>;

#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Anything that may hold a sender can emit events
///
/// Emitting without a sender, or after the receiver is gone, is a no-op:
/// events are diagnostics and never change pipeline behavior.
pub trait EventEmitter {
    fn event_sender(&self) -> Option<&EventSender>;

    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            let _ = sender.send(event);
        }
    }

    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message, None)));
    }

    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(
            message,
            Some(context.into()),
        )));
    }

    /// Start tracking a counted operation
    fn emit_progress_started(
        &self,
        id: impl Into<String>,
        operation: impl Into<String>,
        total: Option<u64>,
    ) {
        self.emit(AppEvent::Progress(ProgressEvent::started(
            id, operation, total,
        )));
    }

    fn emit_progress_updated(&self, id: impl Into<String>, current: u64, total: Option<u64>) {
        self.emit(AppEvent::Progress(ProgressEvent::updated(
            id, current, total,
        )));
    }

    fn emit_progress_completed(&self, id: impl Into<String>, duration: Duration) {
        self.emit(AppEvent::Progress(ProgressEvent::completed(id, duration)));
    }

    fn emit_progress_failed(&self, id: impl Into<String>, failure: FailureContext) {
        self.emit(AppEvent::Progress(ProgressEvent::failed(id, failure)));
    }

    fn emit_fetch(&self, event: FetchEvent) {
        self.emit(AppEvent::Fetch(event));
    }

    fn emit_install(&self, event: InstallEvent) {
        self.emit(AppEvent::Install(event));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
