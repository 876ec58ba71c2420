//! Worker pool running document analysis off the write path.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::analysis::Analyzer;
use crate::index::analysis::{analyze_document, AnalysisResult};
use crate::index::field_cache::FieldCache;
use crate::document::Document;

struct AnalysisWork {
    doc: Document,
    reply: Sender<AnalysisResult>,
}

/// A fixed pool of worker threads that analyze documents concurrently.
///
/// Analysis never touches the store, so many documents can be analyzed in
/// parallel while the single writer drains results in submission order.
#[derive(Debug)]
pub struct AnalysisQueue {
    sender: Option<Sender<AnalysisWork>>,
    workers: Vec<JoinHandle<()>>,
}

impl AnalysisQueue {
    /// Start a pool with the given number of worker threads.
    pub fn new(
        num_workers: usize,
        field_cache: Arc<FieldCache>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let (sender, receiver) = unbounded::<AnalysisWork>();
        let workers = (0..num_workers.max(1))
            .map(|_| {
                let receiver: Receiver<AnalysisWork> = receiver.clone();
                let field_cache = Arc::clone(&field_cache);
                let analyzer = Arc::clone(&analyzer);
                thread::spawn(move || {
                    while let Ok(work) = receiver.recv() {
                        let result = analyze_document(&work.doc, &field_cache, analyzer.as_ref());
                        // the submitter may have gone away; nothing to do then
                        let _ = work.reply.send(result);
                    }
                })
            })
            .collect();
        AnalysisQueue {
            sender: Some(sender),
            workers,
        }
    }

    /// Submit a document for analysis, returning the channel its result
    /// will arrive on.
    pub fn submit(&self, doc: Document) -> Receiver<AnalysisResult> {
        let (reply, result) = bounded(1);
        if let Some(sender) = &self.sender {
            // workers outlive the sender, so this only fails during shutdown
            let _ = sender.send(AnalysisWork { doc, reply });
        }
        result
    }
}

impl Drop for AnalysisQueue {
    fn drop(&mut self) {
        // closing the channel stops the workers
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::document::{Field, IndexingOptions};

    #[test]
    fn test_parallel_analysis() {
        let field_cache = Arc::new(FieldCache::new());
        let queue = AnalysisQueue::new(
            2,
            Arc::clone(&field_cache),
            Arc::new(StandardAnalyzer::new()),
        );

        let receivers: Vec<_> = (0..8)
            .map(|i| {
                let mut doc = Document::new(format!("doc{i}"));
                doc.add_field(Field::text(
                    "desc",
                    "some text to analyze",
                    IndexingOptions::INDEXED,
                ));
                queue.submit(doc)
            })
            .collect();

        for (i, receiver) in receivers.into_iter().enumerate() {
            let result = receiver.recv().unwrap();
            assert_eq!(result.doc_id, format!("doc{i}"));
            assert!(!result.rows.is_empty());
        }

        // one shared field id across every worker
        assert_eq!(field_cache.field_named("desc"), Some(0));
    }
}
