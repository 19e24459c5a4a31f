//! Editor controller.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete editor state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::dispatch`]: Applies a message and runs its side effects
//!
//! Backend requests run as tokio tasks; their completions come back as
//! messages on a channel and are applied by [`App::pump`] or
//! [`App::next_completion`].

mod effects;
mod model;
mod selection;
mod update;

pub use model::{LOAD_ERROR_PLACEHOLDER, Model, ToastLevel, UploadDialog};
pub use selection::{
    BoundingBox, ClickTarget, ImageRef, OffsetAxis, SelectionState, TOOLBAR_GAP, Toolbar,
    normalize_width, strip_origin,
};
pub use update::{Message, update};

use std::collections::{HashMap, VecDeque};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::client::ApiClient;

/// Background request kinds; at most one of each runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Task {
    Load,
    Save,
    Templates,
    Upload,
}

/// Owns the model and drives backend requests for it.
pub struct App {
    model: Model,
    client: ApiClient,
    runtime: Handle,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    tasks: HashMap<Task, JoinHandle<()>>,
}

impl App {
    /// Create an editor talking to `client`, spawning requests on `runtime`.
    pub fn new(client: ApiClient, runtime: Handle) -> Self {
        let (tx, rx) = unbounded_channel();
        let model = Model::new(client.base_url());
        Self {
            model,
            client,
            runtime,
            tx,
            rx,
            tasks: HashMap::new(),
        }
    }

    /// Override the origin stripped from preview image srcs.
    #[must_use]
    pub fn with_page_origin(mut self, origin: impl Into<String>) -> Self {
        self.model.page_origin = origin.into();
        self
    }

    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Whether any backend request is still running.
    pub fn is_busy(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Take the url the host page should navigate to, if any.
    pub fn take_navigation(&mut self) -> Option<String> {
        self.model.navigate_to.take()
    }

    /// Apply a message and everything it triggers synchronously.
    pub fn dispatch(&mut self, msg: Message) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            tracing::trace!(?msg, "dispatch");
            let side_msg = msg.clone();
            self.model = update(std::mem::take(&mut self.model), msg);
            self.handle_message_side_effects(&side_msg, &mut queue);
        }
    }

    /// Apply every request completion that is ready. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(msg) = self.rx.try_recv() {
            drained += 1;
            self.dispatch(msg);
        }
        drained
    }

    /// Wait for the next request completion and apply it.
    ///
    /// Returns `false` when nothing is running.
    pub async fn next_completion(&mut self) -> bool {
        if self.tasks.is_empty() && self.rx.is_empty() {
            return false;
        }
        match self.rx.recv().await {
            Some(msg) => {
                self.dispatch(msg);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no request is running.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }
}

#[cfg(test)]
mod tests;
