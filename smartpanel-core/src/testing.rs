//! Recording fakes for the host collaborators.

use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::time::Duration;

use crate::error::HostError;
use crate::host::{ContentObserver, MessageLevel, Notifier, PanelHost};
use crate::state::HostCommand;

#[derive(Default)]
pub(crate) struct FakeHost {
    calls: RefCell<Vec<HostCommand>>,
    failure: RefCell<Option<String>>,
    latency: Cell<Duration>,
}

impl FakeHost {
    pub fn calls(&self) -> Vec<HostCommand> {
        self.calls.borrow().clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.borrow_mut() = Some(message.to_string());
    }

    pub fn succeed(&self) {
        *self.failure.borrow_mut() = None;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency.set(latency);
    }
}

#[async_trait(?Send)]
impl PanelHost for FakeHost {
    async fn execute(&self, command: HostCommand) -> Result<(), HostError> {
        self.calls.borrow_mut().push(command);
        let latency = self.latency.get();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.failure.borrow().clone() {
            Some(message) => Err(HostError::Rejected(message)),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeObserver {
    count: Cell<usize>,
    unavailable: Cell<bool>,
    queries: Cell<usize>,
}

impl FakeObserver {
    pub fn set_count(&self, count: usize) {
        self.count.set(count);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

#[async_trait(?Send)]
impl ContentObserver for FakeObserver {
    async fn open_surface_count(&self) -> Result<usize, HostError> {
        self.queries.set(self.queries.get() + 1);
        if self.unavailable.get() {
            return Err(HostError::Disconnected);
        }
        Ok(self.count.get())
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: RefCell<Vec<(MessageLevel, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.borrow().clone()
    }

    pub fn warnings(&self) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|(level, _)| *level == MessageLevel::Warning)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: MessageLevel, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}
