//! Data-source contracts and the in-memory source.
//!
//! A [`DataSource`] is opened once per scoring run; the returned
//! [`SourceContext`] hands out a finite, non-restartable record stream.
//! Contexts and cursors release their resources on drop, so an abandoned
//! run cleans up the same way a finished one does.

use crate::error::SourceError;
use crate::record::Record;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lazy sequence of records projected onto the requested features.
pub type RecordStream<'a> = BoxStream<'a, Result<Record, SourceError>>;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Acquire a context for one scoring run.
    async fn open(&self) -> Result<Box<dyn SourceContext>, SourceError>;
}

pub trait SourceContext: Send {
    /// Stream records projected onto `features`. A fresh stream must be
    /// requested per run.
    fn stream(&mut self, features: Vec<String>) -> RecordStream<'_>;
}

/// Usage counters shared between a [`MemorySource`] and its contexts.
#[derive(Debug, Default)]
pub struct SourceUsage {
    opens: AtomicUsize,
    live: AtomicUsize,
    streamed: AtomicUsize,
}

impl SourceUsage {
    /// Contexts opened so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Contexts opened and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Records handed out across all streams.
    pub fn streamed(&self) -> usize {
        self.streamed.load(Ordering::SeqCst)
    }
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Arc<Vec<Record>>,
    usage: Arc<SourceUsage>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
            usage: Arc::new(SourceUsage::default()),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn usage(&self) -> &SourceUsage {
        &self.usage
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn open(&self) -> Result<Box<dyn SourceContext>, SourceError> {
        self.usage.opens.fetch_add(1, Ordering::SeqCst);
        self.usage.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySourceContext {
            records: Arc::clone(&self.records),
            usage: Arc::clone(&self.usage),
        }))
    }
}

struct MemorySourceContext {
    records: Arc<Vec<Record>>,
    usage: Arc<SourceUsage>,
}

impl SourceContext for MemorySourceContext {
    fn stream(&mut self, features: Vec<String>) -> RecordStream<'_> {
        let usage = Arc::clone(&self.usage);
        stream::iter(self.records.iter())
            .map(move |record| {
                usage.streamed.fetch_add(1, Ordering::SeqCst);
                Ok(record.project(&features))
            })
            .boxed()
    }
}

impl Drop for MemorySourceContext {
    fn drop(&mut self) {
        self.usage.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn memory_source_projects_and_counts() {
        let source = MemorySource::new(vec![
            Record::new("a").with_feature("x", 1.0).with_feature("y", 2.0),
            Record::new("b").with_feature("x", 3.0).with_feature("y", 4.0),
        ]);
        {
            let mut ctx = source.open().await.expect("open");
            assert_eq!(source.usage().live(), 1);
            let records: Vec<Record> = ctx
                .stream(vec!["x".to_string()])
                .try_collect()
                .await
                .expect("stream");
            assert_eq!(records.len(), 2);
            assert!(records.iter().all(|r| r.feature("y").is_none()));
        }
        assert_eq!(source.usage().opens(), 1);
        assert_eq!(source.usage().live(), 0);
        assert_eq!(source.usage().streamed(), 2);
    }
}
