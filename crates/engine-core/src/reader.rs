use crate::{
    convert::RowConverter,
    counters::{Counters, ReturnValues},
    error::ReaderError,
    router::OutcomeRouter,
    settings::ReaderSettings,
};
use connectors::bulk::runtime::BulkRuntime;
use model::{
    records::{outcome::Outcome, result_row::BulkResultRow},
    schema::Schema,
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Unstarted,
    /// The cursor points at a classified row.
    Ready,
    Exhausted,
    /// A stream-fatal error ended the run; only `close()` remains useful.
    Failed,
    Closed,
}

/// Position in the job's results. Only the current batch is held in memory.
#[derive(Debug, Default)]
struct Cursor {
    batch_index: usize,
    row_index: usize,
    rows: Vec<BulkResultRow>,
}

/// Pull-style reader over the per-row results of a bulk job.
///
/// `start()` submits the job and lands on the first row; `advance()`
/// steps through the rows of every batch in index order, fetching batch
/// logs lazily and skipping empty ones. Each landed row is converted,
/// routed and counted exactly once; `current()` exposes its outcome.
pub struct ResultReader<R: BulkRuntime> {
    runtime: R,
    settings: ReaderSettings,
    converter: RowConverter,
    router: OutcomeRouter,
    state: ReaderState,
    batch_count: usize,
    cursor: Cursor,
    current: Option<Outcome>,
    counters: Counters,
}

impl<R: BulkRuntime> ResultReader<R> {
    pub fn new(runtime: R, settings: ReaderSettings, schema: Arc<Schema>) -> Self {
        let converter = RowConverter::new(&settings.job.module, schema);
        let router = OutcomeRouter::new(settings.business_key_field().is_some());

        ResultReader {
            runtime,
            settings,
            converter,
            router,
            state: ReaderState::Unstarted,
            batch_count: 0,
            cursor: Cursor::default(),
            current: None,
            counters: Counters::new(),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Submits the job and positions the reader on its first row.
    /// Returns `false` when the job produced no rows at all.
    pub async fn start(&mut self) -> Result<bool, ReaderError> {
        if self.state != ReaderState::Unstarted {
            return Err(ReaderError::Config(format!(
                "start() called on a reader in state {:?}",
                self.state
            )));
        }

        let result = self.open().await;
        self.guard(result)
    }

    /// Moves to the next row, crossing batch boundaries as needed.
    /// Once it returns `false` it keeps returning `false`.
    pub async fn advance(&mut self) -> Result<bool, ReaderError> {
        match self.state {
            ReaderState::Ready => {}
            ReaderState::Unstarted => {
                return Err(ReaderError::Config("advance() called before start()".into()));
            }
            ReaderState::Exhausted | ReaderState::Failed | ReaderState::Closed => {
                return Ok(false);
            }
        }

        self.current = None;
        self.cursor.row_index += 1;
        let result = self.land().await;
        self.guard(result)
    }

    /// Outcome of the row under the cursor; `None` unless the last
    /// `start()`/`advance()` returned `true`.
    pub fn current(&self) -> Option<&Outcome> {
        match self.state {
            ReaderState::Ready => self.current.as_ref(),
            _ => None,
        }
    }

    pub fn return_values(&self) -> ReturnValues {
        self.counters.snapshot()
    }

    /// Releases the bulk connection. Safe to call in any state and more
    /// than once; only the first call reaches the runtime.
    pub async fn close(&mut self) -> Result<(), ReaderError> {
        if self.state == ReaderState::Closed {
            return Ok(());
        }

        self.state = ReaderState::Closed;
        self.current = None;
        self.cursor = Cursor::default();

        let values = self.counters.snapshot();
        info!(
            "Closing result reader for '{}': total={}, success={}, reject={}",
            self.settings.job.module, values.total, values.success, values.reject
        );

        self.runtime.close().await?;
        Ok(())
    }

    async fn open(&mut self) -> Result<bool, ReaderError> {
        self.settings.validate(self.converter.schema())?;

        self.runtime.set_concurrency_mode(self.settings.concurrency_mode);
        self.runtime.set_poll_settings(self.settings.poll_settings());
        self.runtime.submit(&self.settings.job).await?;

        self.batch_count = self.runtime.batch_count().await?;
        self.counters = Counters::new();

        if self.batch_count == 0 {
            info!("Job on '{}' has no batches", self.settings.job.module);
            self.state = ReaderState::Exhausted;
            return Ok(false);
        }

        self.load_batch(0).await?;
        self.land().await
    }

    /// Walks forward from the cursor until it rests on a real row, skipping
    /// exhausted and empty batches, then classifies that row.
    async fn land(&mut self) -> Result<bool, ReaderError> {
        while self.cursor.row_index >= self.cursor.rows.len() {
            let next = self.cursor.batch_index + 1;
            if next >= self.batch_count {
                info!(
                    "Drained {} batches for '{}'",
                    self.batch_count, self.settings.job.module
                );
                self.state = ReaderState::Exhausted;
                self.cursor.rows = Vec::new();
                return Ok(false);
            }

            self.load_batch(next).await?;
        }

        let outcome = self.classify_current();
        self.counters.classify(&outcome);
        self.current = Some(outcome);
        self.state = ReaderState::Ready;
        Ok(true)
    }

    async fn load_batch(&mut self, batch_index: usize) -> Result<(), ReaderError> {
        let key_field = self.settings.business_key_field();
        let rows = self.runtime.batch_log(batch_index, key_field).await?;

        info!(
            "Fetched batch {}/{} with {} result rows",
            batch_index + 1,
            self.batch_count,
            rows.len()
        );

        self.cursor = Cursor {
            batch_index,
            row_index: 0,
            rows,
        };
        Ok(())
    }

    fn classify_current(&self) -> Outcome {
        let Cursor {
            batch_index,
            row_index,
            ref rows,
        } = self.cursor;
        let row = &rows[row_index];

        let outcome = self
            .router
            .route(row, self.converter.convert(row), batch_index, row_index);
        debug!(
            "Batch {} row {} -> {}",
            batch_index,
            row_index,
            if outcome.is_accepted() { "accepted" } else { "rejected" }
        );
        outcome
    }

    fn guard(&mut self, result: Result<bool, ReaderError>) -> Result<bool, ReaderError> {
        if result.is_err() {
            self.state = ReaderState::Failed;
            self.current = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::{bulk::polling::PollSettings, error::BulkError};
    use model::{
        core::data_type::DataType,
        execution::job::{BulkJob, ConcurrencyMode, OutputAction},
        schema::SchemaField,
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tracing_test::traced_test;

    #[derive(Default)]
    struct MockRuntime {
        batches: Vec<Vec<BulkResultRow>>,
        fail_fetch_at: Option<usize>,
        timeout_at: Option<usize>,
        fetched: Vec<(usize, Option<String>)>,
        mode: Option<ConcurrencyMode>,
        poll: Option<PollSettings>,
        close_calls: Arc<AtomicUsize>,
    }

    impl MockRuntime {
        fn with_batches(sizes: &[usize]) -> Self {
            let batches = sizes
                .iter()
                .enumerate()
                .map(|(batch, &size)| {
                    (0..size)
                        .map(|row| {
                            let name = format!("b{batch}r{row}");
                            BulkResultRow::from_log_record([
                                ("Success", "true"),
                                ("Name", name.as_str()),
                            ])
                        })
                        .collect()
                })
                .collect();

            MockRuntime {
                batches,
                ..Default::default()
            }
        }

        fn with_rows(batches: Vec<Vec<BulkResultRow>>) -> Self {
            MockRuntime {
                batches,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BulkRuntime for MockRuntime {
        fn set_concurrency_mode(&mut self, mode: ConcurrencyMode) {
            self.mode = Some(mode);
        }

        fn set_poll_settings(&mut self, settings: PollSettings) {
            self.poll = Some(settings);
        }

        async fn submit(&mut self, _job: &BulkJob) -> Result<(), BulkError> {
            Ok(())
        }

        async fn batch_count(&mut self) -> Result<usize, BulkError> {
            Ok(self.batches.len())
        }

        async fn batch_log(
            &mut self,
            batch_index: usize,
            key_field: Option<&str>,
        ) -> Result<Vec<BulkResultRow>, BulkError> {
            self.fetched
                .push((batch_index, key_field.map(str::to_string)));

            if self.fail_fetch_at == Some(batch_index) {
                return Err(BulkError::Transport("connection reset".into()));
            }
            if self.timeout_at == Some(batch_index) {
                return Err(BulkError::Timeout {
                    batch: batch_index,
                    polls: 3,
                    waited_ms: 30,
                });
            }

            let rows = self.batches[batch_index].clone();
            Ok(match key_field {
                Some(key) => rows.into_iter().map(|r| r.with_business_key(key)).collect(),
                None => rows,
            })
        }

        async fn close(&mut self) -> Result<(), BulkError> {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            SchemaField::new("Name", DataType::String, true),
            SchemaField::new("ExternalId__c", DataType::String, true),
        ]))
    }

    fn settings() -> ReaderSettings {
        ReaderSettings {
            job: BulkJob {
                module: "Account".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn upsert_settings() -> ReaderSettings {
        ReaderSettings {
            job: BulkJob {
                module: "Account".into(),
                action: OutputAction::Upsert,
                upsert_key_column: Some("ExternalId__c".into()),
                ..Default::default()
            },
            output_upsert_key: true,
            ..Default::default()
        }
    }

    async fn collect_names(reader: &mut ResultReader<MockRuntime>) -> Vec<String> {
        let mut names = Vec::new();
        let mut has_row = reader.start().await.unwrap();
        while has_row {
            let outcome = reader.current().unwrap();
            names.push(outcome.record().get_value("Name").to_string());
            has_row = reader.advance().await.unwrap();
        }
        names
    }

    fn log_row(pairs: &[(&str, &str)]) -> BulkResultRow {
        BulkResultRow::from_log_record(pairs.iter().copied())
    }

    #[tokio::test]
    async fn test_no_batches_means_no_data() {
        let mut reader = ResultReader::new(MockRuntime::default(), settings(), schema());

        assert!(!reader.start().await.unwrap());
        assert_eq!(reader.return_values(), ReturnValues::default());
        assert!(reader.current().is_none());
        assert!(!reader.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_crosses_batch_boundary() {
        let mut reader =
            ResultReader::new(MockRuntime::with_batches(&[2, 1]), settings(), schema());

        assert!(reader.start().await.unwrap());
        assert!(reader.advance().await.unwrap());
        assert!(reader.advance().await.unwrap());

        let third = reader.current().unwrap();
        assert_eq!(third.record().get_value("Name").to_string(), "b1r0");
        let fetched: Vec<_> = reader.runtime().fetched.iter().map(|(i, _)| *i).collect();
        assert_eq!(fetched, vec![0, 1]);

        assert!(!reader.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_skips_empty_batches() {
        let mut reader =
            ResultReader::new(MockRuntime::with_batches(&[0, 0, 3]), settings(), schema());

        let names = collect_names(&mut reader).await;

        assert_eq!(names, vec!["b2r0", "b2r1", "b2r2"]);
        assert_eq!(reader.return_values().total, 3);
    }

    #[tokio::test]
    async fn test_skips_empty_batches_between_and_after_rows() {
        let mut reader = ResultReader::new(
            MockRuntime::with_batches(&[1, 0, 0, 2, 0]),
            settings(),
            schema(),
        );

        let names = collect_names(&mut reader).await;

        assert_eq!(names, vec!["b0r0", "b3r0", "b3r1"]);
        let fetched: Vec<_> = reader.runtime().fetched.iter().map(|(i, _)| *i).collect();
        assert_eq!(fetched, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_all_batches_empty() {
        let mut reader =
            ResultReader::new(MockRuntime::with_batches(&[0, 0]), settings(), schema());

        assert!(!reader.start().await.unwrap());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert_eq!(reader.return_values(), ReturnValues::default());
    }

    #[tokio::test]
    async fn test_exhaustion_is_idempotent() {
        let mut reader = ResultReader::new(MockRuntime::with_batches(&[1]), settings(), schema());

        assert!(reader.start().await.unwrap());
        for _ in 0..3 {
            assert!(!reader.advance().await.unwrap());
            assert!(reader.current().is_none());
        }
        assert_eq!(reader.runtime().fetched.len(), 1);
        assert_eq!(reader.return_values().total, 1);
    }

    #[tokio::test]
    async fn test_counters_stay_consistent() {
        let runtime = MockRuntime::with_rows(vec![
            vec![
                log_row(&[("Success", "true"), ("Name", "a")]),
                log_row(&[("Success", "false"), ("Error", "E1"), ("Name", "b")]),
            ],
            vec![],
            vec![
                log_row(&[("Success", "FALSE"), ("Error", "E2"), ("Name", "c")]),
                log_row(&[("Success", "True"), ("Name", "d")]),
                log_row(&[("Success", "true"), ("Name", "e")]),
            ],
        ]);
        let mut reader = ResultReader::new(runtime, settings(), schema());

        let mut previous = reader.return_values();
        let mut has_row = reader.start().await.unwrap();
        while has_row {
            let values = reader.return_values();
            assert_eq!(values.total, values.success + values.reject);
            assert_eq!(values.total, previous.total + 1);
            assert!(values.success >= previous.success && values.reject >= previous.reject);
            previous = values;
            has_row = reader.advance().await.unwrap();
        }

        assert_eq!(
            reader.return_values(),
            ReturnValues {
                total: 5,
                success: 3,
                reject: 2
            }
        );
    }

    #[tokio::test]
    async fn test_rejection_without_key_output() {
        let runtime = MockRuntime::with_rows(vec![vec![log_row(&[
            ("Success", "false"),
            ("Error", "DUPLICATE_VALUE"),
            ("Name", "x"),
        ])]]);
        let mut reader = ResultReader::new(runtime, settings(), schema());

        assert!(reader.start().await.unwrap());
        let rejected = reader.current().unwrap().as_rejected().unwrap();

        assert_eq!(rejected.error, "DUPLICATE_VALUE");
        assert_eq!(rejected.business_key, None);
        assert_eq!(reader.runtime().fetched[0].1, None);
    }

    #[tokio::test]
    async fn test_rejection_with_key_output() {
        let runtime = MockRuntime::with_rows(vec![vec![log_row(&[
            ("Success", "false"),
            ("Error", "DUPLICATE_VALUE"),
            ("Name", "x"),
            ("ExternalId__c", "E-42"),
        ])]]);
        let mut reader = ResultReader::new(runtime, upsert_settings(), schema());

        assert!(reader.start().await.unwrap());
        let rejected = reader.current().unwrap().as_rejected().unwrap();

        assert_eq!(rejected.error, "DUPLICATE_VALUE");
        assert_eq!(rejected.business_key.as_deref(), Some("E-42"));
        assert_eq!(
            reader.runtime().fetched[0].1.as_deref(),
            Some("ExternalId__c")
        );
    }

    #[tokio::test]
    async fn test_key_output_ignored_for_non_upsert() {
        let runtime = MockRuntime::with_rows(vec![vec![log_row(&[
            ("Success", "false"),
            ("Error", "DUPLICATE_VALUE"),
            ("ExternalId__c", "E-42"),
        ])]]);
        let mut settings = upsert_settings();
        settings.job.action = OutputAction::Insert;
        settings.job.upsert_key_column = None;
        let mut reader = ResultReader::new(runtime, settings, schema());

        assert!(reader.start().await.unwrap());
        let rejected = reader.current().unwrap().as_rejected().unwrap();

        assert_eq!(rejected.business_key, None);
        assert_eq!(reader.runtime().fetched[0].1, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal_not_a_reject() {
        let mut runtime = MockRuntime::with_rows(vec![
            vec![log_row(&[("Success", "false"), ("Error", "E"), ("Name", "a")])],
            vec![log_row(&[("Success", "true"), ("Name", "b")])],
        ]);
        runtime.fail_fetch_at = Some(1);
        let mut reader = ResultReader::new(runtime, settings(), schema());

        assert!(reader.start().await.unwrap());
        let err = reader.advance().await.unwrap_err();

        assert!(matches!(err, ReaderError::Transport(BulkError::Transport(_))));
        assert_eq!(
            reader.return_values(),
            ReturnValues {
                total: 1,
                success: 0,
                reject: 1
            }
        );
        assert_eq!(reader.state(), ReaderState::Failed);
        assert!(reader.current().is_none());
        assert!(!reader.advance().await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_timeout() {
        let mut runtime = MockRuntime::with_batches(&[1]);
        runtime.timeout_at = Some(0);
        let mut reader = ResultReader::new(runtime, settings(), schema());

        let err = reader.start().await.unwrap_err();

        assert!(matches!(err, ReaderError::Timeout { batch: 0, polls: 3, .. }));
        assert_eq!(reader.return_values().total, 0);
    }

    #[tokio::test]
    async fn test_misconfiguration_fails_start() {
        let mut settings = upsert_settings();
        settings.job.upsert_key_column = None;
        let mut reader = ResultReader::new(MockRuntime::with_batches(&[1]), settings, schema());

        assert!(matches!(reader.start().await, Err(ReaderError::Config(_))));
        assert!(reader.runtime().fetched.is_empty());
    }

    #[tokio::test]
    async fn test_start_applies_runtime_settings() {
        let mut settings = settings();
        settings.concurrency_mode = ConcurrencyMode::Serial;
        settings.await_time_ms = 250;
        settings.safety_switch = Some(4);
        let mut reader = ResultReader::new(MockRuntime::with_batches(&[1]), settings, schema());

        reader.start().await.unwrap();

        assert_eq!(reader.runtime().mode, Some(ConcurrencyMode::Serial));
        assert_eq!(
            reader.runtime().poll,
            Some(PollSettings {
                await_time: std::time::Duration::from_millis(250),
                safety_switch: Some(4)
            })
        );
        assert!(matches!(reader.start().await, Err(ReaderError::Config(_))));
    }

    #[tokio::test]
    async fn test_advance_before_start_is_rejected() {
        let mut reader = ResultReader::new(MockRuntime::with_batches(&[1]), settings(), schema());
        assert!(matches!(reader.advance().await, Err(ReaderError::Config(_))));
        assert!(reader.current().is_none());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_close_releases_runtime_once() {
        let runtime = MockRuntime::with_batches(&[3]);
        let close_calls = runtime.close_calls.clone();
        let mut reader = ResultReader::new(runtime, settings(), schema());

        assert!(reader.start().await.unwrap());
        reader.close().await.unwrap();
        reader.close().await.unwrap();

        assert_eq!(close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(reader.state(), ReaderState::Closed);
        assert!(reader.current().is_none());
        assert!(!reader.advance().await.unwrap());
        assert!(logs_contain("Closing result reader for 'Account'"));
    }

    #[tokio::test]
    async fn test_close_before_start() {
        let runtime = MockRuntime::default();
        let close_calls = runtime.close_calls.clone();
        let mut reader = ResultReader::new(runtime, settings(), schema());

        reader.close().await.unwrap();

        assert_eq!(close_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(reader.start().await, Err(ReaderError::Config(_))));
    }
}
