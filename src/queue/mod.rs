mod outcome;
mod report;
mod request;

pub use outcome::{derive_result, DownloadOutcome};
pub use report::{
    failure_file_layer, FailureLog, ProgressReporter, TracingFailureLog, TracingProgress,
    FAILURE_TARGET,
};
pub use request::{validate_url, DownloadRequest, RejectReason, RejectedUrl};

use crate::{
    config::Config,
    media::{CookieExtractor, DownloadOptions, Extractor, FfmpegLocator},
};
use anyhow::{Context, Result};
use request::host_matches;
use std::{collections::VecDeque, path::PathBuf, sync::Arc};
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tracing::{debug, error, info};

pub type OutcomeSender = mpsc::UnboundedSender<(String, DownloadOutcome)>;

/// Resolved, long-lived settings the options bundle is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub output_dir: PathBuf,
    pub max_workers: usize,
    pub cookie_file: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    /// `None` accepts any http(s) host.
    pub platform_hosts: Option<Vec<String>>,
}

impl ControllerSettings {
    pub fn new(output_dir: PathBuf) -> Self {
        let defaults = Config::default();
        Self {
            output_dir,
            max_workers: defaults.max_workers,
            cookie_file: None,
            ffmpeg_path: None,
            platform_hosts: Some(defaults.platform_hosts),
        }
    }

    pub async fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, &FfmpegLocator::new(), &CookieExtractor::new()).await
    }

    /// Locates ffmpeg and exports cookies. Only a missing ffmpeg with
    /// `require_ffmpeg` set is an error.
    pub async fn resolve_with(
        config: &Config,
        ffmpeg: &FfmpegLocator,
        cookies: &CookieExtractor,
    ) -> Result<Self> {
        let ffmpeg_path = if config.require_ffmpeg {
            Some(ffmpeg.require(config.ffmpeg_path.as_deref()).await?)
        } else {
            ffmpeg.locate(config.ffmpeg_path.as_deref()).await
        };

        let cookie_file = match &config.browser {
            Some(browser) => cookies.extract(browser).await,
            None => None,
        };

        Ok(Self {
            output_dir: config.output_dir.clone(),
            max_workers: config.max_workers,
            cookie_file,
            ffmpeg_path,
            platform_hosts: config
                .restrict_platform
                .then(|| config.platform_hosts.clone()),
        })
    }
}

pub struct ControllerBuilder {
    settings: ControllerSettings,
    extractor: Arc<dyn Extractor>,
    progress: Option<Arc<dyn ProgressReporter>>,
    failure_log: Option<Arc<dyn FailureLog>>,
    outcomes: Option<OutcomeSender>,
}

impl ControllerBuilder {
    pub fn progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    pub fn failure_log(mut self, log: Arc<dyn FailureLog>) -> Self {
        self.failure_log = Some(log);
        self
    }

    /// Every finished item is also sent here as `(target, outcome)`.
    pub fn outcomes(mut self, tx: OutcomeSender) -> Self {
        self.outcomes = Some(tx);
        self
    }

    pub fn build(self) -> Result<DownloadController> {
        std::fs::create_dir_all(&self.settings.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.settings.output_dir.display()
            )
        })?;

        let workers = self.settings.max_workers.max(1);
        let (processing, _) = watch::channel(false);

        info!(
            "Download controller ready: output={}, workers={}, extractor={}",
            self.settings.output_dir.display(),
            workers,
            self.extractor.name()
        );

        Ok(DownloadController {
            inner: Arc::new(Inner {
                settings: self.settings,
                extractor: self.extractor,
                queue: Mutex::new(VecDeque::new()),
                processing,
                workers: Arc::new(Semaphore::new(workers)),
                progress: self.progress,
                failure_log: self.failure_log,
                outcomes: self.outcomes,
            }),
        })
    }
}

struct Inner {
    settings: ControllerSettings,
    extractor: Arc<dyn Extractor>,
    queue: Mutex<VecDeque<DownloadRequest>>,
    processing: watch::Sender<bool>,
    workers: Arc<Semaphore>,
    progress: Option<Arc<dyn ProgressReporter>>,
    failure_log: Option<Arc<dyn FailureLog>>,
    outcomes: Option<OutcomeSender>,
}

/// FIFO download queue drained by at most one loop at a time.
#[derive(Clone)]
pub struct DownloadController {
    inner: Arc<Inner>,
}

impl DownloadController {
    pub fn builder(settings: ControllerSettings, extractor: Arc<dyn Extractor>) -> ControllerBuilder {
        ControllerBuilder {
            settings,
            extractor,
            progress: None,
            failure_log: None,
            outcomes: None,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.inner.settings
    }

    pub fn is_processing(&self) -> bool {
        *self.inner.processing.borrow()
    }

    /// Number of requests not yet finished, including the one in flight.
    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    pub fn options(&self) -> DownloadOptions {
        let settings = &self.inner.settings;
        DownloadOptions::build(
            &settings.output_dir,
            settings.cookie_file.as_deref(),
            settings.ffmpeg_path.as_deref(),
        )
    }

    /// Queues every well-formed URL and starts draining if nothing is.
    /// Rejected inputs are not queued; they are returned for the caller to
    /// report or ignore.
    pub async fn enqueue<I, S>(&self, urls: I) -> Vec<RejectedUrl>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = self.inner.settings.platform_hosts.as_deref();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for input in urls {
            let input = input.as_ref();
            match validate_url(input, hosts) {
                Ok(url) => accepted.push(DownloadRequest::Url(url)),
                Err(reason) => {
                    debug!("Dropping {:?}: {}", input, reason);
                    rejected.push(RejectedUrl {
                        input: input.to_string(),
                        reason,
                    });
                }
            }
        }

        self.push(accepted).await;
        rejected
    }

    /// Queues `ytsearch1:` lookups for each non-empty term.
    pub async fn enqueue_search<I, S>(&self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requests = terms
            .into_iter()
            .map(|term| term.as_ref().trim().to_string())
            .filter(|term| !term.is_empty())
            .map(DownloadRequest::Search)
            .collect();
        self.push(requests).await;
    }

    async fn push(&self, requests: Vec<DownloadRequest>) {
        if !requests.is_empty() {
            let mut queue = self.inner.queue.lock().await;
            debug!("Queueing {} requests", requests.len());
            queue.extend(requests);
        }

        if !self.inner.queue.lock().await.is_empty() && self.claim() {
            let this = self.clone();
            tokio::spawn(async move { this.drain_claimed().await });
        }
    }

    /// Resolves once no drain loop is running and the queue is empty.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.processing.subscribe();
        loop {
            let _ = rx.wait_for(|processing| !*processing).await;
            if self.inner.queue.lock().await.is_empty() {
                return;
            }
            // Queued behind a loop that had already released its claim.
            if self.claim() {
                let this = self.clone();
                tokio::spawn(async move { this.drain_claimed().await });
            } else {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Runs the drain loop on the current task. Returns at once when the
    /// queue is empty or another loop is already draining it.
    pub async fn drain(&self) {
        if self.inner.queue.lock().await.is_empty() || !self.claim() {
            return;
        }
        self.drain_claimed().await;
    }

    fn claim(&self) -> bool {
        self.inner.processing.send_if_modified(|processing| {
            if *processing {
                false
            } else {
                *processing = true;
                true
            }
        })
    }

    async fn drain_claimed(&self) {
        info!("Processing download queue");
        let mut completed = 0;

        loop {
            let (next, remaining) = {
                let queue = self.inner.queue.lock().await;
                (queue.front().cloned(), queue.len())
            };

            let Some(request) = next else {
                self.inner.processing.send_replace(false);
                // Items pushed while the claim was still held saw it taken.
                if !self.inner.queue.lock().await.is_empty() && self.claim() {
                    continue;
                }
                break;
            };

            let outcome = self
                .process_item(&request, completed + 1, completed + remaining)
                .await;

            self.inner.queue.lock().await.pop_front();
            completed += 1;

            if let Some(tx) = &self.inner.outcomes {
                let _ = tx.send((request.target(), outcome));
            }
        }

        info!("Download queue drained after {} items", completed);
    }

    /// Downloads a single request outside the queue.
    pub async fn process(&self, request: &DownloadRequest) -> DownloadOutcome {
        self.process_item(request, 1, 1).await
    }

    async fn process_item(
        &self,
        request: &DownloadRequest,
        current: usize,
        total: usize,
    ) -> DownloadOutcome {
        let target = request.target();

        if let (DownloadRequest::Url(url), Some(hosts)) =
            (request, &self.inner.settings.platform_hosts)
        {
            let host = url.host_str().unwrap_or_default();
            if !host_matches(host, hosts) {
                debug!("Skipping {}: unsupported host", target);
                return DownloadOutcome::Skipped {
                    reason: RejectReason::ForeignHost(host.to_string()).to_string(),
                };
            }
        }

        let options = self.options();

        let (progress_tx, forwarder) = match &self.inner.progress {
            Some(reporter) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<f64>();
                let reporter = reporter.clone();
                let handle = tokio::spawn(async move {
                    while let Some(pct) = rx.recv().await {
                        reporter.report(current, total, &format!("downloading {pct:.1}%"));
                    }
                });
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };

        let permit = match self.inner.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return self.handle_error(&target, &e.to_string()),
        };

        let extractor = self.inner.extractor.clone();
        let task_target = target.clone();
        let result = tokio::spawn(async move {
            let _permit = permit;
            extractor.extract(&task_target, &options, progress_tx).await
        })
        .await;

        if let Some(forwarder) = forwarder {
            let _ = forwarder.await;
        }

        let outcome = match result {
            Ok(Ok(metadata)) => {
                match derive_result(&self.inner.settings.output_dir, metadata.as_ref()) {
                    Some(path) => DownloadOutcome::Completed(path),
                    None => {
                        info!("Nothing downloaded for {}", target);
                        DownloadOutcome::Skipped {
                            reason: "no media was downloaded".to_string(),
                        }
                    }
                }
            }
            Ok(Err(e)) => self.handle_error(&target, &format!("{e:#}")),
            Err(e) => self.handle_error(&target, &e.to_string()),
        };

        if let Some(reporter) = &self.inner.progress {
            let status = match &outcome {
                DownloadOutcome::Completed(_) => "done",
                DownloadOutcome::Skipped { .. } => "skipped",
                DownloadOutcome::Failed { .. } => "failed",
            };
            reporter.report(current, total, status);
        }

        outcome
    }

    fn handle_error(&self, target: &str, reason: &str) -> DownloadOutcome {
        let message = format!("Failed to download {target}: {reason}");
        error!("{}", message);
        if let Some(log) = &self.inner.failure_log {
            log.error(&message);
        }
        DownloadOutcome::Failed {
            reason: reason.to_string(),
        }
    }
}
