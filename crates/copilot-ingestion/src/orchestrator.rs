//! Job consumer and stage sequencer (spec §4.1, §5, §6).
//!
//! Drives one `file.index` or `file.delete` job end to end: Load → Parse →
//! Structure → Chunk → Enrich → Persist, with per-stage timeouts and
//! bounded retry of transient failures. Retry/backoff is ported from
//! `copilot-infra::resilience::retry` (kept as an internal module rather
//! than a dependency: the crate carries sqlx/redis/async-nats this
//! pipeline has no other use for) and timeout enforcement follows
//! `copilot-infra::resilience::timeout`'s `with_timeout` shape.

use crate::chunk;
use crate::config::PipelineConfig;
use crate::enrich::{self, llm::HypotheticalQuestionProvider};
use crate::error::{PipelineError, Result, Stage};
use crate::load::{self, ObjectStore};
use crate::parse;
use crate::structure;
use crate::types::{ChildChunk, ChunkLineage, EnrichedParentChunk, FileDescriptor};
use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// A job pulled off the durable queue (spec §6).
#[derive(Debug, Clone)]
pub enum Job {
    Index(FileDescriptor),
    Delete { file_id: String, document_id: String },
}

/// Backoff schedule for retrying transient stage failures. Mirrors
/// `copilot-infra::resilience::retry::RetryPolicy` without pulling in the
/// crate: exponential growth from `initial_delay`, capped at `max_delay`,
/// with up to `jitter_factor` of random jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = capped * self.jitter_factor * rand::thread_rng().gen::<f64>();
        Duration::from_secs_f64(capped + jitter)
    }
}

/// Retries `operation` while it returns a retryable `PipelineError`, up to
/// `policy.max_retries` attempts, sleeping with exponential backoff
/// between attempts.
async fn retry_with<F, Fut, T>(policy: &RetryPolicy, stage: Stage, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(stage = %stage, attempt, delay_ms = delay.as_millis(), error = %err, "retrying transient stage failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Runs `operation` under the stage's configured timeout. A stage that
/// times out is given one re-run before failing terminally (spec §7:
/// `StageTimeout` → "retry once, then terminal").
async fn with_stage_timeout<F, Fut, T>(stage: Stage, budget: Duration, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Ok(result) = tokio::time::timeout(budget, operation()).await {
        return result;
    }
    warn!(stage = %stage, budget_ms = budget.as_millis(), "stage timed out, retrying once");

    match tokio::time::timeout(budget, operation()).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::StageTimeout { stage }),
    }
}

/// A fully enriched document, ready for the persist step.
pub struct PipelineOutput {
    pub file_id: String,
    pub document_id: String,
    pub parents: Vec<EnrichedParentChunk>,
    pub children: Vec<ChildChunk>,
    pub lineage: Vec<ChunkLineage>,
    pub warnings: Vec<String>,
}

/// Deletes any prior artifacts for a file, then writes the new batch as a
/// single unit (spec §6: "on conflict ... prior rows are deleted first
/// within the same transaction").
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn delete_file(&self, file_id: &str) -> Result<()>;
    async fn persist(&self, output: &PipelineOutput) -> Result<()>;
}

/// Emitted after successful persistence to trigger external
/// vectorization (spec §6).
#[async_trait]
pub trait VectorIndexSignal: Send + Sync {
    async fn signal(&self, file_id: &str, parent_ids: Vec<String>, child_ids: Vec<String>);
}

/// No-op signal for configurations with no vectorization worker wired up.
pub struct NullVectorIndexSignal;

#[async_trait]
impl VectorIndexSignal for NullVectorIndexSignal {
    async fn signal(&self, _file_id: &str, _parent_ids: Vec<String>, _child_ids: Vec<String>) {}
}

/// Running totals across jobs processed by one orchestrator instance,
/// ported from the teacher's `IngestionPipeline::stats`.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub documents_processed: AtomicU64,
    pub documents_failed: AtomicU64,
    pub parent_chunks_created: AtomicU64,
    pub child_chunks_created: AtomicU64,
}

impl PipelineStats {
    fn record_success(&self, parent_count: usize, child_count: usize) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.parent_chunks_created
            .fetch_add(parent_count as u64, Ordering::Relaxed);
        self.child_chunks_created
            .fetch_add(child_count as u64, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Drives jobs against a fixed set of collaborators. One instance is
/// shared across the worker pool (spec §5: default 4 concurrent workers).
pub struct Orchestrator {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    repository: Arc<dyn PipelineRepository>,
    vector_signal: Arc<dyn VectorIndexSignal>,
    llm_provider: Arc<dyn HypotheticalQuestionProvider>,
    retry_policy: RetryPolicy,
    stats: PipelineStats,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
        repository: Arc<dyn PipelineRepository>,
        vector_signal: Arc<dyn VectorIndexSignal>,
        llm_provider: Arc<dyn HypotheticalQuestionProvider>,
    ) -> Self {
        let retry_policy = RetryPolicy {
            max_retries: config.max_retry_attempts,
            ..RetryPolicy::default()
        };
        Self {
            config,
            store,
            repository,
            vector_signal,
            llm_provider,
            retry_policy,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Runs one job to completion. `file.delete` short-circuits the
    /// stage pipeline; `file.index` is idempotent by `fileId` (prior
    /// artifacts are deleted before the new batch is persisted).
    #[instrument(skip(self, job), fields(job = ?job))]
    pub async fn run_job(&self, job: Job) -> Result<()> {
        match job {
            Job::Delete { file_id, .. } => {
                retry_with(&self.retry_policy, Stage::Load, || self.repository.delete_file(&file_id)).await
            }
            Job::Index(descriptor) => {
                let file_id = descriptor.file_id.clone();
                match self.index_one(descriptor).await {
                    Ok(output) => {
                        self.stats.record_success(output.parents.len(), output.children.len());
                        info!(file_id = %file_id, parents = output.parents.len(), children = output.children.len(), "job completed");
                        Ok(())
                    }
                    Err(err) => {
                        self.stats.record_failure();
                        warn!(file_id = %file_id, error = %err, "job failed");
                        Err(err)
                    }
                }
            }
        }
    }

    async fn index_one(&self, descriptor: FileDescriptor) -> Result<PipelineOutput> {
        let file_id = descriptor.file_id.clone();
        let document_id = descriptor.document_id.clone();
        let timeouts = self.config.stage_timeouts.clone();

        retry_with(&self.retry_policy, Stage::Load, || self.repository.delete_file(&file_id)).await?;

        let store = self.store.clone();
        let loaded = with_stage_timeout(Stage::Load, timeouts.load(), || async {
            retry_with(&self.retry_policy, Stage::Load, || load::load(store.as_ref(), &descriptor)).await
        })
        .await?;

        let parsed = with_stage_timeout(Stage::Parse, timeouts.parse(), || async { parse::parse(&loaded) }).await?;

        let structured =
            with_stage_timeout(Stage::Structure, timeouts.structure(), || async { structure::structure(&parsed) })
                .await?;

        let chunk_output = with_stage_timeout(Stage::Chunk, timeouts.chunk(), || async {
            Ok(chunk::chunk(&structured.sections, &file_id, &document_id, &self.config.chunk))
        })
        .await?;

        let enrich_config = self.config.enrich.clone();
        let llm_provider = self.llm_provider.clone();
        let enriched_parents = with_stage_timeout(Stage::Enrich, timeouts.enrich(), || async {
            Ok(enrich::enrich(chunk_output.parents.clone(), &enrich_config, llm_provider.as_ref()).await)
        })
        .await?;

        let output = PipelineOutput {
            file_id: file_id.clone(),
            document_id,
            parents: enriched_parents,
            children: chunk_output.children,
            lineage: chunk_output.lineage,
            warnings: structured.warnings,
        };

        retry_with(&self.retry_policy, Stage::Enrich, || self.repository.persist(&output)).await?;

        let parent_ids: Vec<String> = output.parents.iter().map(|p| p.parent.id.to_string()).collect();
        let child_ids: Vec<String> = output.children.iter().map(|c| c.id.to_string()).collect();
        self.vector_signal.signal(&file_id, parent_ids, child_ids).await;

        Ok(output)
    }

    /// Runs a batch of jobs with at most `worker_pool_size` running
    /// concurrently (spec §5). Returns one result per job, same order.
    pub async fn run_batch(self: &Arc<Self>, jobs: Vec<Job>) -> Vec<Result<()>> {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size));
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let orchestrator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                orchestrator.run_job(job).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_err) => results.push(Err(PipelineError::Other(join_err.to_string()))),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::llm::NullProvider;
    use crate::types::FileLocation;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::io::AsyncRead;

    struct InMemoryStore {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStore for InMemoryStore {
        async fn read(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| PipelineError::StorageTerminal(format!("not found: {path}")))
        }

        async fn open_stream(&self, _path: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
            Err(PipelineError::StorageTerminal("streaming not supported in test store".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingRepository {
        persisted: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PipelineRepository for RecordingRepository {
        async fn delete_file(&self, file_id: &str) -> Result<()> {
            self.deleted.lock().unwrap().push(file_id.to_string());
            Ok(())
        }

        async fn persist(&self, output: &PipelineOutput) -> Result<()> {
            self.persisted.lock().unwrap().push(output.file_id.clone());
            Ok(())
        }
    }

    fn descriptor(file_id: &str, bytes: &[u8]) -> FileDescriptor {
        FileDescriptor {
            file_id: file_id.to_string(),
            document_id: "doc-1".to_string(),
            filename: "note.md".to_string(),
            declared_mime_type: Some("text/markdown".to_string()),
            size: bytes.len() as u64,
            location: FileLocation::Buffer(bytes.to_vec()),
        }
    }

    #[tokio::test]
    async fn index_job_persists_and_deletes_prior_artifacts() {
        let store = Arc::new(InMemoryStore { files: HashMap::new() });
        let repository = Arc::new(RecordingRepository::default());
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            store,
            repository.clone(),
            Arc::new(NullVectorIndexSignal),
            Arc::new(NullProvider),
        );

        let text = "# Title\n\nFirst paragraph with enough words to form a parent chunk on its own merit.\n\n## Section\n\nSecond paragraph continues the discussion in more detail than the first.";
        let job = Job::Index(descriptor("file-1", text.as_bytes()));
        orchestrator.run_job(job).await.unwrap();

        assert_eq!(repository.deleted.lock().unwrap().as_slice(), ["file-1"]);
        assert_eq!(repository.persisted.lock().unwrap().as_slice(), ["file-1"]);
        assert_eq!(orchestrator.stats().documents_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn unsupported_mime_fails_terminally_without_retry() {
        let store = Arc::new(InMemoryStore { files: HashMap::new() });
        let repository = Arc::new(RecordingRepository::default());
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            store,
            repository.clone(),
            Arc::new(NullVectorIndexSignal),
            Arc::new(NullProvider),
        );

        let mut bad = descriptor("file-2", b"\x89PNG\r\n\x1a\nrest-of-file");
        bad.declared_mime_type = Some("image/png".to_string());
        let result = orchestrator.run_job(Job::Index(bad)).await;

        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
        assert!(repository.persisted.lock().unwrap().is_empty());
        assert_eq!(orchestrator.stats().documents_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn delete_job_skips_the_stage_pipeline() {
        let store = Arc::new(InMemoryStore { files: HashMap::new() });
        let repository = Arc::new(RecordingRepository::default());
        let orchestrator = Orchestrator::new(
            PipelineConfig::default(),
            store,
            repository.clone(),
            Arc::new(NullVectorIndexSignal),
            Arc::new(NullProvider),
        );

        orchestrator
            .run_job(Job::Delete { file_id: "file-3".to_string(), document_id: "doc-1".to_string() })
            .await
            .unwrap();

        assert_eq!(repository.deleted.lock().unwrap().as_slice(), ["file-3"]);
        assert!(repository.persisted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_batch_respects_worker_pool_bound() {
        let store = Arc::new(InMemoryStore { files: HashMap::new() });
        let repository = Arc::new(RecordingRepository::default());
        let config = PipelineConfig { worker_pool_size: 2, ..PipelineConfig::default() };
        let orchestrator = Arc::new(Orchestrator::new(
            config,
            store,
            repository.clone(),
            Arc::new(NullVectorIndexSignal),
            Arc::new(NullProvider),
        ));

        let jobs = (0..5)
            .map(|i| Job::Index(descriptor(&format!("file-{i}"), b"# T\n\nSome words here to form a parent chunk for the test.")))
            .collect();
        let results = orchestrator.run_batch(jobs).await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(repository.persisted.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn stage_timeout_is_retried_once_before_failing() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = with_stage_timeout(Stage::Parse, Duration::from_millis(20), || async {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            if attempt == 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok::<_, PipelineError>(attempt)
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn stage_timeout_fails_terminally_after_one_retry() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result: Result<()> = with_stage_timeout(Stage::Parse, Duration::from_millis(10), || async {
            attempts.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(PipelineError::StageTimeout { stage: Stage::Parse })));
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
    }
}
