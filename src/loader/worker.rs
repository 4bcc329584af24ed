use crate::loader::Loader;
use crate::render::protocol::{LoadCommand, LoadEvent, RequestId};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// Run the load worker, processing commands from the coordinator until shutdown.
///
/// Progress events are best-effort and dropped when the channel is full; the final
/// `Loaded`/`Failed` event for each request is always delivered.
pub async fn load_worker_loop(mut rx: Receiver<LoadCommand>, tx: Sender<LoadEvent>, loader: Loader) {
    let state = WorkerState::new(loader, tx.clone());

    while let Some(cmd) = rx.recv().await {
        let outcome = state.handle_command(cmd).await;
        if let Some(event) = outcome.event {
            if tx.send(event).await.is_err() {
                break;
            }
        }

        if outcome.done {
            break;
        }
    }
}

struct WorkerState {
    loader: Loader,
    progress_tx: Sender<LoadEvent>,
}

impl WorkerState {
    fn new(loader: Loader, progress_tx: Sender<LoadEvent>) -> Self {
        Self {
            loader,
            progress_tx,
        }
    }

    async fn handle_command(&self, cmd: LoadCommand) -> HandlerOutcome {
        match cmd {
            LoadCommand::Load {
                request_id,
                root,
                modified_after,
            } => HandlerOutcome::respond(self.load(request_id, root, modified_after).await),
            LoadCommand::Shutdown => HandlerOutcome::exit(),
        }
    }

    async fn load(
        &self,
        request_id: RequestId,
        root: PathBuf,
        modified_after: Option<DateTime<Utc>>,
    ) -> LoadEvent {
        let progress_tx = self.progress_tx.clone();
        let result = self
            .loader
            .load(&root, modified_after, move |progress| {
                let _ = progress_tx.try_send(LoadEvent::Progress {
                    request_id,
                    progress,
                });
            })
            .await;

        match result {
            Ok(loaded) => LoadEvent::Loaded {
                request_id,
                store: Arc::new(loaded.store),
                report: loaded.report,
            },
            Err(error) => {
                log::error!("load of {} failed: {}", root.display(), error);
                LoadEvent::Failed { request_id, error }
            }
        }
    }
}

struct HandlerOutcome {
    event: Option<LoadEvent>,
    done: bool,
}

impl HandlerOutcome {
    fn respond(event: LoadEvent) -> Self {
        Self {
            event: Some(event),
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            event: None,
            done: true,
        }
    }
}
