use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use bookflow::{ChapterLoader, LoadCompletion, LoadError, LoadOutcome, LoadTicket, SourceError};
use crossbeam_channel::{Receiver, Sender, unbounded};

/// Where chapter fetches run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One short-lived worker thread per ticket.
    #[default]
    Threaded,
    /// The fetch runs inside `dispatch`; the completion is still delivered through the queue.
    Inline,
}

/// Runs [`LoadTicket`]s and hands their completions back to the owning thread.
///
/// Completions are queued in arrival order; the owner drains them with [`Self::try_drain`] (or
/// blocks with [`Self::wait`]) and feeds each one to `ReadingSession::complete_load`.
#[derive(Debug)]
pub struct LoadDispatcher {
    loader: ChapterLoader,
    mode: DispatchMode,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
    outstanding: usize,
}

impl LoadDispatcher {
    pub fn new(loader: ChapterLoader, mode: DispatchMode) -> Self {
        let (tx, rx) = unbounded();
        Self {
            loader,
            mode,
            tx,
            rx,
            outstanding: 0,
        }
    }

    pub fn threaded(loader: ChapterLoader) -> Self {
        Self::new(loader, DispatchMode::Threaded)
    }

    pub fn inline(loader: ChapterLoader) -> Self {
        Self::new(loader, DispatchMode::Inline)
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn loader(&self) -> &ChapterLoader {
        &self.loader
    }

    /// Only affects tickets dispatched afterwards.
    pub fn loader_mut(&mut self) -> &mut ChapterLoader {
        &mut self.loader
    }

    /// Tickets dispatched whose completion has not been received yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn dispatch(&mut self, ticket: LoadTicket) {
        self.outstanding += 1;
        adebug!(
            chapter_index = ticket.chapter_index,
            generation = ticket.generation,
            mode = ?self.mode,
            "dispatch"
        );

        if self.mode == DispatchMode::Threaded {
            let loader = self.loader.clone();
            let tx = self.tx.clone();
            let worker = ticket.clone();
            let spawned = thread::Builder::new()
                .name(format!("bookflow-load-{}", ticket.chapter_index))
                .spawn(move || {
                    let outcome = load_guarded(&loader, &worker);
                    let _ = tx.send(LoadCompletion {
                        ticket: worker,
                        outcome,
                    });
                });
            match spawned {
                Ok(_) => return,
                Err(err) => {
                    awarn!(error = %err, "dispatch: could not spawn worker, loading inline");
                }
            }
        }

        let outcome = load_guarded(&self.loader, &ticket);
        let _ = self.tx.send(LoadCompletion { ticket, outcome });
    }

    pub fn dispatch_all(&mut self, tickets: impl IntoIterator<Item = LoadTicket>) {
        for ticket in tickets {
            self.dispatch(ticket);
        }
    }

    /// Every completion that has arrived so far, without blocking.
    pub fn try_drain(&mut self) -> Vec<LoadCompletion> {
        let mut out = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            out.push(completion);
        }
        self.outstanding = self.outstanding.saturating_sub(out.len());
        out
    }

    /// Blocks for at most `timeout` for the next completion.
    ///
    /// Returns `None` immediately when nothing is outstanding.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadCompletion> {
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.rx.recv_timeout(timeout).ok()?;
        self.outstanding -= 1;
        Some(completion)
    }
}

/// A panicking content source becomes a failed outcome; every dispatched ticket completes.
fn load_guarded(loader: &ChapterLoader, ticket: &LoadTicket) -> LoadOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| {
        loader.load_chapter(&ticket.chapter, ticket.chapter_index)
    }))
    .unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        awarn!(
            chapter_index = ticket.chapter_index,
            panic = %message,
            "content source panicked"
        );
        LoadOutcome::Error {
            chapter_index: ticket.chapter_index,
            chapter: ticket.chapter.clone(),
            error: LoadError::Fetch {
                url: ticket.chapter.url.clone(),
                source: SourceError::new(format!("content source panicked: {message}")),
            },
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
