use crate::{QueryState, slugify};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{sync::mpsc, task::JoinHandle};

const CHANNEL_CAPACITY: usize = 64;

struct Inner {
    output: PathBuf,
    sender: Mutex<Option<mpsc::Sender<QueryState>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    written: Arc<AtomicU64>,
}

/// Writes every [`QueryState`] it receives to its own `.sql` file.
///
/// Files land in `<output>/<YYYY_MM_DD>/<flags slug>/<context id>/<sequence>____<runtime>.sql`,
/// the sequence is the arrival order starting at zero. Writing happens on a single background
/// task, a failed write is logged and the next state is processed.
#[derive(Clone)]
pub struct Profiler {
    inner: Arc<Inner>,
}

impl Profiler {
    /// Starts the writer, must be called from within a tokio runtime.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let written = Arc::new(AtomicU64::new(0));
        let (sender, mut receiver) = mpsc::channel::<QueryState>(CHANNEL_CAPACITY);
        let worker = tokio::spawn({
            let output = output.clone();
            let written = written.clone();
            async move {
                let mut sequence = 0u64;
                while let Some(state) = receiver.recv().await {
                    let path = profile_path(&output, sequence, &state);
                    sequence += 1;
                    match write(&path, &state).await {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            log::error!("While writing profile {}: {:#}", path.display(), e);
                        }
                    }
                }
            }
        });
        Self {
            inner: Arc::new(Inner {
                output,
                sender: Mutex::new(Some(sender)),
                worker: tokio::sync::Mutex::new(Some(worker)),
                written,
            }),
        }
    }

    pub fn output(&self) -> &Path {
        &self.inner.output
    }

    /// Number of files written so far.
    pub fn written(&self) -> u64 {
        self.inner.written.load(Ordering::Relaxed)
    }

    /// Queues `state` for writing. Returns false once the profiler is closed.
    pub async fn push(&self, state: QueryState) -> bool {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender {
            Some(sender) => sender.send(state).await.is_ok(),
            None => false,
        }
    }

    /// Stops accepting states and waits until the queued ones are written.
    /// Calling it again has no effect.
    pub async fn close(&self) {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut worker = self.inner.worker.lock().await;
        if let Some(worker) = worker.take() {
            if let Err(e) = worker.await {
                log::error!("Profiler writer failed: {:#}", e);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("output", &self.inner.output)
            .field("written", &self.written())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Location of the profile of `state`, the `sequence`-th state received by a profiler writing
/// into `output`.
pub fn profile_path(output: &Path, sequence: u64, state: &QueryState) -> PathBuf {
    let date = state.start().date();
    let mut flags = slugify(&state.context_flags().join(" "));
    if flags.is_empty() {
        flags = "default".into();
    }
    output
        .join(format!(
            "{:04}_{:02}_{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
        .join(flags)
        .join(state.context_id())
        .join(format!("{:08}____{:?}.sql", sequence, state.runtime()))
}

async fn write(path: &Path, state: &QueryState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, state.bytes()).await
}
