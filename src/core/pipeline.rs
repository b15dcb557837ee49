//! Pipeline coordinator for one domain.
//!
//! Three folder watchers (incoming, success, failure) are multiplexed in a
//! single select loop. Every incoming file is handed to the domain handler in
//! its own task; events from the success and failure folders are only logged
//! and counted. Handler tasks live in a `JoinSet` so finished ones are reaped
//! and in-flight ones can be drained on shutdown.
//!
//! There is no cap on concurrent handler tasks unless one is configured with
//! [`IngestPipeline::with_max_concurrent_handlers`]: N files arriving together
//! means N handlers running together.

use crate::core::watcher::FolderWatcher;
use crate::domain::model::{Domain, FileReport, FileState};
use crate::domain::ports::FileHandler;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDirs {
    pub incoming: PathBuf,
    pub success: PathBuf,
    pub failure: PathBuf,
}

impl PipelineDirs {
    pub fn new(
        incoming: impl Into<PathBuf>,
        success: impl Into<PathBuf>,
        failure: impl Into<PathBuf>,
    ) -> Self {
        Self {
            incoming: incoming.into(),
            success: success.into(),
            failure: failure.into(),
        }
    }

    /// `<root>/<domain>` under each of the three roots.
    pub fn for_domain(
        incoming_root: impl AsRef<Path>,
        success_root: impl AsRef<Path>,
        failure_root: impl AsRef<Path>,
        domain: Domain,
    ) -> Self {
        Self {
            incoming: incoming_root.as_ref().join(domain.as_str()),
            success: success_root.as_ref().join(domain.as_str()),
            failure: failure_root.as_ref().join(domain.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Handler returned but the file could not be moved out of incoming.
    pub stuck_in_incoming: usize,
    pub panicked: usize,
    pub observed_success: usize,
    pub observed_failure: usize,
}

pub struct IngestPipeline<H: FileHandler> {
    domain: Domain,
    dirs: PipelineDirs,
    handler: Arc<H>,
    max_concurrent_handlers: Option<usize>,
}

impl<H: FileHandler> IngestPipeline<H> {
    pub fn new(domain: Domain, dirs: PipelineDirs, handler: H) -> Self {
        Self {
            domain,
            dirs,
            handler: Arc::new(handler),
            max_concurrent_handlers: None,
        }
    }

    pub fn with_max_concurrent_handlers(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_handlers = limit;
        self
    }

    pub fn dirs(&self) -> &PipelineDirs {
        &self.dirs
    }

    /// Starts the three watchers concurrently. Once this returns every folder
    /// exists and is being watched.
    pub async fn start(self) -> PipelineRunner<H> {
        let (incoming, success, failure) = tokio::join!(
            FolderWatcher::start(&self.dirs.incoming),
            FolderWatcher::start(&self.dirs.success),
            FolderWatcher::start(&self.dirs.failure),
        );
        tracing::info!(
            "Started data ingestion watcher for {} ({})",
            self.domain,
            incoming.path().display()
        );

        PipelineRunner {
            domain: self.domain,
            dirs: self.dirs,
            handler: self.handler,
            limiter: self
                .max_concurrent_handlers
                .map(|limit| Arc::new(Semaphore::new(limit))),
            incoming,
            success,
            failure,
        }
    }
}

pub struct PipelineRunner<H: FileHandler> {
    domain: Domain,
    dirs: PipelineDirs,
    handler: Arc<H>,
    limiter: Option<Arc<Semaphore>>,
    incoming: FolderWatcher,
    success: FolderWatcher,
    failure: FolderWatcher,
}

impl<H: FileHandler> PipelineRunner<H> {
    /// Runs the select loop until `shutdown` resolves, then waits for the
    /// handler tasks still in flight.
    pub async fn run_until<F>(self, shutdown: F) -> PipelineSummary
    where
        F: Future<Output = ()>,
    {
        let PipelineRunner {
            domain,
            dirs,
            handler,
            limiter,
            mut incoming,
            mut success,
            mut failure,
        } = self;

        let mut tasks: JoinSet<FileReport> = JoinSet::new();
        let mut summary = PipelineSummary::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping {} pipeline", domain);
                    break;
                }
                Some(path) = incoming.next() => {
                    tracing::debug!("New pending file change detected: {}", path.display());
                    summary.dispatched += 1;
                    dispatch(&mut tasks, &handler, &limiter, &dirs, path);
                }
                Some(path) = success.next() => {
                    tracing::debug!(
                        "New success file change detected. Data successfully ingested!: {}",
                        path.display()
                    );
                    summary.observed_success += 1;
                }
                Some(path) = failure.next() => {
                    tracing::debug!(
                        "There was an error on the data ingestion of the following file: {}",
                        path.display()
                    );
                    summary.observed_failure += 1;
                }
                Some(joined) = tasks.join_next() => {
                    record(&mut summary, domain, joined);
                }
                else => {
                    tracing::warn!("All {} watchers stopped", domain);
                    break;
                }
            }
        }

        if !tasks.is_empty() {
            tracing::info!(
                "Waiting for {} in-flight {} file(s)",
                tasks.len(),
                domain
            );
        }
        while let Some(joined) = tasks.join_next().await {
            record(&mut summary, domain, joined);
        }

        summary
    }

    /// Runs until the process ends.
    pub async fn run(self) -> PipelineSummary {
        self.run_until(std::future::pending::<()>()).await
    }
}

fn dispatch<H: FileHandler>(
    tasks: &mut JoinSet<FileReport>,
    handler: &Arc<H>,
    limiter: &Option<Arc<Semaphore>>,
    dirs: &PipelineDirs,
    path: PathBuf,
) {
    let handler = Arc::clone(handler);
    let limiter = limiter.clone();
    let success_dir = dirs.success.clone();
    let failure_dir = dirs.failure.clone();

    tasks.spawn(async move {
        // permit 在任務內取得，主迴圈不會被阻塞
        let _permit = match limiter {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };
        handler.handle(&path, &success_dir, &failure_dir).await
    });
}

fn record(summary: &mut PipelineSummary, domain: Domain, joined: Result<FileReport, JoinError>) {
    match joined {
        Ok(report) => {
            match report.state {
                FileState::Succeeded => summary.succeeded += 1,
                FileState::Failed => summary.failed += 1,
                FileState::Incoming => summary.stuck_in_incoming += 1,
            }
            tracing::debug!(
                "Finished {} file {}: {:?} ({} record(s) submitted)",
                domain,
                report.file_name,
                report.state,
                report.records_submitted
            );
        }
        Err(e) => {
            summary.panicked += 1;
            tracing::error!("{} handler task did not complete: {}", domain, e);
        }
    }
}

/// Watches the three folders and hands each incoming file to `handler`.
/// Never returns under normal operation.
pub async fn start_pipeline<H: FileHandler>(domain: Domain, dirs: PipelineDirs, handler: H) {
    let summary = IngestPipeline::new(domain, dirs, handler).start().await.run().await;
    tracing::warn!("{} pipeline ended: {:?}", domain, summary);
}
