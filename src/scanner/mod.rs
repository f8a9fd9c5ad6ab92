//! Scanner module - coordinates concurrent TCP connect scans.
//!
//! A [`ScanCoordinator`] turns one [`ScanRequest`] into one probe task per
//! port, runs them on its [`WorkerPool`], and pushes an event for every
//! finished probe into the returned [`ScanHandle`] as soon as it completes.
//! Events arrive in completion order, not port order.

pub mod event;
pub mod pool;
pub mod resolve;
pub mod tcp;
pub mod traits;

use crate::error::ScanError;
use crate::types::{ScanId, ScanRequest};
use futures::Stream;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

pub use event::{ScanEvent, ScanProgress, ScanSummary};
pub use pool::{WorkerPool, DEFAULT_MAX_CONCURRENCY};
pub use resolve::DnsResolver;
pub use tcp::{PortProbe, TcpTransport};
pub use traits::{PortResult, PortState, Resolver, Transport};

/// Default per-probe connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration consumed by the scan core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on each connection attempt.
    pub timeout: Duration,
    /// Maximum number of probes executing at once.
    pub max_concurrency: usize,
    /// Emit events for closed, filtered and failed ports too.
    pub report_closed: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            report_closed: false,
        }
    }
}

impl ScanConfig {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the concurrency cap.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Report closed ports as well as open ones.
    pub fn with_closed(mut self) -> Self {
        self.report_closed = true;
        self
    }

    /// Reject configurations that could never complete a scan.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs scans on an explicitly owned worker pool.
pub struct ScanCoordinator {
    config: ScanConfig,
    pool: WorkerPool,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn Resolver>,
}

impl ScanCoordinator {
    /// Coordinator using real TCP connects and DNS resolution.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        Self::with_components(config, Arc::new(TcpTransport::new()), Arc::new(DnsResolver::new()))
    }

    /// Coordinator with caller-provided transport and resolver.
    pub fn with_components(
        config: ScanConfig,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        let pool = WorkerPool::new(config.max_concurrency)?;
        Ok(Self {
            config,
            pool,
            transport,
            resolver,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Validate `start..=end` and start scanning `host`.
    ///
    /// An inverted range fails here with [`ScanError::InvalidRange`] before
    /// any network activity; everything after validation is reported
    /// through the handle.
    pub fn start_scan(
        &self,
        host: impl Into<String>,
        start: u16,
        end: u16,
    ) -> Result<ScanHandle, ScanError> {
        let request = ScanRequest::new(host, start, end)?;
        Ok(self.scan(request))
    }

    /// Start scanning a validated request.
    ///
    /// Must be called from within a tokio runtime.
    pub fn scan(&self, request: ScanRequest) -> ScanHandle {
        let id = ScanId::new();
        let (tx, rx) = mpsc::channel(self.pool.capacity());
        let cancel = CancellationToken::new();
        let progress = ScanProgress::new(request.port_count() as u64);

        let run = ScanRun {
            id,
            request,
            pool: self.pool.clone(),
            probe: PortProbe::new(Arc::clone(&self.transport), self.config.timeout),
            resolver: Arc::clone(&self.resolver),
            report_closed: self.config.report_closed,
            events: tx,
            cancel: cancel.clone(),
            progress: progress.clone(),
        };
        let span = info_span!("scan", id = %id.short(), host = %run.request.host());
        let task = tokio::spawn(run.execute().instrument(span));

        ScanHandle {
            id,
            events: rx,
            cancel,
            progress,
            task,
        }
    }
}

/// State owned by one background scan task.
struct ScanRun {
    id: ScanId,
    request: ScanRequest,
    pool: WorkerPool,
    probe: PortProbe,
    resolver: Arc<dyn Resolver>,
    report_closed: bool,
    events: mpsc::Sender<ScanEvent>,
    cancel: CancellationToken,
    progress: ScanProgress,
}

impl ScanRun {
    async fn execute(self) -> ScanSummary {
        let started = Instant::now();
        let mut summary = ScanSummary::new(self.id, &self.request);
        info!(ports = %self.request.range(), "scan started");

        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            resolved = self.resolver.resolve(self.request.host()) => Some(resolved),
        };

        match resolved {
            None => summary.cancelled = true,
            Some(Err(error)) => {
                warn!(%error, "scan aborted");
                summary.failed = true;
                let _ = self.events.send(ScanEvent::Failed { error }).await;
            }
            Some(Ok(target)) => {
                summary.address = Some(target);
                self.probe_all(target, &mut summary).await;
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            probed = summary.probed,
            open = summary.open,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed_ms,
            "scan finished"
        );
        summary
    }

    /// Schedule one probe per port in ascending order, then drain every
    /// spawned probe so the pool is idle again when this returns.
    async fn probe_all(&self, target: IpAddr, summary: &mut ScanSummary) {
        let mut tasks = JoinSet::new();

        for port in self.request.range() {
            if self.events.is_closed() {
                debug!("event receiver dropped, cancelling");
                self.cancel.cancel();
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = self.pool.admit() => permit,
            };
            let Some(permit) = permit else {
                summary.cancelled = true;
                break;
            };

            while let Some(joined) = tasks.try_join_next() {
                record(summary, joined);
            }

            let probe = self.probe.clone();
            let events = self.events.clone();
            let progress = self.progress.clone();
            let report_closed = self.report_closed;

            tasks.spawn(async move {
                let result = probe.probe(target, port).await;
                let state = result.state;
                progress.advance();
                if let Some(event) = ScanEvent::from_result(result, report_closed) {
                    let _ = events.send(event).await;
                }
                drop(permit);
                state
            });
        }

        if summary.cancelled {
            info!(in_flight = tasks.len(), "scan cancelled, draining in-flight probes");
        }

        while let Some(joined) = tasks.join_next().await {
            record(summary, joined);
        }
    }
}

fn record(summary: &mut ScanSummary, joined: Result<PortState, tokio::task::JoinError>) {
    match joined {
        Ok(state) => summary.record(state),
        Err(e) => warn!(error = %e, "probe task failed"),
    }
}

/// Cloneable cancel switch for a running scan.
#[derive(Debug, Clone)]
pub struct ScanCanceller(CancellationToken);

impl ScanCanceller {
    /// Stop admitting new probes. In-flight probes finish normally.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Consumer side of one running scan.
///
/// Yields [`ScanEvent`]s until the scan ends, either directly via
/// [`next_event`](Self::next_event) or as a [`Stream`]. A handle covers a
/// single run and cannot be restarted.
#[derive(Debug)]
pub struct ScanHandle {
    id: ScanId,
    events: mpsc::Receiver<ScanEvent>,
    cancel: CancellationToken,
    progress: ScanProgress,
    task: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Next event, or `None` once the scan has ended.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Stop admitting new probes; the stream ends once in-flight probes
    /// have finished, which takes at most one probe timeout.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A cancel switch that can be moved to another task.
    pub fn canceller(&self) -> ScanCanceller {
        ScanCanceller(self.cancel.clone())
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress.clone()
    }

    /// Discard any remaining events and wait for the scan to end.
    pub async fn finish(mut self) -> Result<ScanSummary, ScanError> {
        while self.events.recv().await.is_some() {}
        self.task
            .await
            .map_err(|e| ScanError::TaskFailed(e.to_string()))
    }
}

impl Stream for ScanHandle {
    type Item = ScanEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}
