use std::collections::VecDeque;
use std::future::Future;

use crate::client::ApiClient;
use crate::render::render;

use super::{App, Message, Task};

impl App {
    /// Issue the backend requests a message asks for and queue follow-ups.
    ///
    /// Runs after `update`, so the model already reflects the message.
    pub(super) fn handle_message_side_effects(
        &mut self,
        msg: &Message,
        queue: &mut VecDeque<Message>,
    ) {
        match msg {
            Message::LoadRequested => {
                self.spawn(Task::Load, |client| async move {
                    Message::LoadFinished(client.load_markdown().await.map_err(|e| e.to_string()))
                });
            }
            Message::SaveRequested if !self.tasks.contains_key(&Task::Save) => {
                if let Some(markdown) = self.model.pending_save.clone() {
                    self.spawn(Task::Save, |client| async move {
                        Message::SaveFinished(
                            client
                                .save_markdown(&markdown)
                                .await
                                .map_err(|e| e.to_string()),
                        )
                    });
                }
            }
            Message::TemplatesRequested => {
                self.spawn(Task::Templates, |client| async move {
                    Message::TemplatesLoaded(
                        client.list_templates().await.map_err(|e| e.to_string()),
                    )
                });
            }
            Message::UploadRequested(Some(request))
                if self.model.upload.in_flight() && !self.tasks.contains_key(&Task::Upload) =>
            {
                let request = request.clone();
                let progress = self.tx.clone();
                self.spawn(Task::Upload, |client| async move {
                    let result = client
                        .upload_image(request, move |percent| {
                            let _ = progress.send(Message::UploadProgress(percent));
                        })
                        .await;
                    Message::UploadFinished(result.map_err(|e| e.to_string()))
                });
            }
            Message::CancelUpload => {
                if let Some(handle) = self.tasks.remove(&Task::Upload) {
                    handle.abort();
                    tracing::info!("upload cancelled");
                }
            }
            Message::LoadFinished(_) => self.finish(Task::Load),
            Message::SaveFinished(_) => self.finish(Task::Save),
            Message::TemplatesLoaded(_) => self.finish(Task::Templates),
            Message::UploadFinished(_) => self.finish(Task::Upload),
            _ => {}
        }

        if self.model.render_requested {
            self.model.render_requested = false;
            let preview = render(&self.model.buffer.text(), self.model.preview.generation + 1);
            queue.push_back(Message::RenderCompleted(preview));
        }
    }

    /// Run a request on the runtime; its message is sent back when done.
    fn spawn<F, Fut>(&mut self, task: Task, job: F)
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Message> + Send + 'static,
    {
        let tx = self.tx.clone();
        let request = job(self.client.clone());
        let handle = self.runtime.spawn(async move {
            let _ = tx.send(request.await);
        });
        if let Some(previous) = self.tasks.insert(task, handle) {
            tracing::debug!(?task, "replacing running request");
            previous.abort();
        }
    }

    fn finish(&mut self, task: Task) {
        self.tasks.remove(&task);
    }
}
