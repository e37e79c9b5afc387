//! Classifier and training collaborators.
//!
//! The real system runs a trained model behind these seams; the built-in
//! implementations are deterministic keyword heuristics so the core works
//! (and is testable) without any model artifacts on disk.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Category, Priority, Sentiment};
use crate::query::{build_query, EffectiveQuerySpec, RawFilters};
use crate::storage::ComplaintStore;

/// Classifier verdict for one complaint at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub sentiment: Sentiment,
    pub priority: Priority,
    pub confidence: f64,
}

/// Invoked once at complaint creation; failures surface as Upstream errors.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Classification>;
}

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Delivery, &["delivery", "deliver", "shipping", "shipment", "courier", "package", "parcel", "late", "lost"]),
    (Category::Billing, &["bill", "billing", "invoice", "charge", "charged", "refund", "payment", "overcharged", "price"]),
    (Category::Technical, &["crash", "error", "bug", "login", "website", "app", "broken", "technical", "outage"]),
    (Category::Quality, &["quality", "defective", "damaged", "faulty", "poor", "cheap", "cracked", "stopped working"]),
    (Category::Service, &["service", "support", "staff", "rude", "agent", "representative", "waiting", "hold", "response"]),
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "angry", "furious", "unacceptable", "disappointed",
    "broken", "late", "rude", "never", "useless", "poor",
];

const POSITIVE_WORDS: &[&str] = &["good", "great", "thanks", "thank", "excellent", "happy", "pleased", "resolved", "helpful"];

const URGENT_WORDS: &[&str] = &["urgent", "immediately", "asap", "emergency", "critical", "lawyer", "legal", "unsafe", "danger"];

/// Keyword-table classifier: category by keyword hit count, sentiment by
/// lexicon balance, priority from urgency cues and sentiment. Same text in,
/// same verdict out.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn score(text: &str, words: &[&str]) -> usize {
        words.iter().filter(|w| text.contains(*w)).count()
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Result<Classification> {
        let lower = text.to_lowercase();

        // first table wins a tie so the verdict is order-stable
        let mut category = Category::Service;
        let mut best = 0usize;
        for (cat, words) in CATEGORY_KEYWORDS {
            let hits = Self::score(&lower, words);
            if hits > best {
                best = hits;
                category = *cat;
            }
        }

        let neg = Self::score(&lower, NEGATIVE_WORDS);
        let pos = Self::score(&lower, POSITIVE_WORDS);
        let sentiment = if neg > pos {
            Sentiment::Negative
        } else if pos > neg {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        };

        let urgent = Self::score(&lower, URGENT_WORDS);
        let priority = if urgent > 0 {
            Priority::Critical
        } else if sentiment == Sentiment::Negative && neg >= 2 {
            Priority::High
        } else if sentiment == Sentiment::Negative {
            Priority::Medium
        } else {
            Priority::Low
        };

        // keyword coverage as a crude stand-in for model probability
        let confidence = if best == 0 { 0.2 } else { (0.5 + 0.1 * best as f64).min(0.95) };

        Ok(Classification { category, sentiment, priority, confidence })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrainStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Pollable handle to a retraining run. The core never blocks on it.
#[derive(Clone, Debug)]
pub struct RetrainJob {
    pub job_id: String,
    status: Arc<RwLock<RetrainStatus>>,
    detail: Arc<RwLock<Option<String>>>,
}

impl RetrainJob {
    pub fn new() -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: Arc::new(RwLock::new(RetrainStatus::Queued)),
            detail: Arc::new(RwLock::new(None)),
        }
    }

    pub fn status(&self) -> RetrainStatus {
        *self.status.read()
    }

    pub fn detail(&self) -> Option<String> {
        self.detail.read().clone()
    }

    pub fn set_status(&self, status: RetrainStatus) {
        *self.status.write() = status;
    }

    pub fn fail(&self, reason: &str) {
        *self.status.write() = RetrainStatus::Failed;
        *self.detail.write() = Some(reason.to_string());
    }
}

impl Default for RetrainJob {
    fn default() -> Self { Self::new() }
}

/// Fire-and-forget retraining seam: returns immediately with a handle.
pub trait Trainer: Send + Sync {
    fn start_retrain(&self) -> Result<RetrainJob>;
}

/// Minimum number of operator-corrected complaints before a retrain run is
/// worth anything.
pub const MIN_FEEDBACK_SAMPLES: usize = 10;

/// Counts operator corrections (category fixed by hand, which clears the
/// classifier confidence) and completes or fails the job on a worker thread.
pub struct LocalTrainer {
    pub complaints: Arc<dyn ComplaintStore>,
}

impl LocalTrainer {
    pub fn new(complaints: Arc<dyn ComplaintStore>) -> Self {
        Self { complaints }
    }
}

impl Trainer for LocalTrainer {
    fn start_retrain(&self) -> Result<RetrainJob> {
        let job = RetrainJob::new();
        let handle = job.clone();
        let store = Arc::clone(&self.complaints);
        std::thread::spawn(move || {
            handle.set_status(RetrainStatus::Running);
            let unscoped = EffectiveQuerySpec {
                spec: match build_query(&RawFilters::default()) {
                    Ok(s) => s,
                    Err(e) => {
                        handle.fail(&e.to_string());
                        return;
                    }
                },
                submitted_by: None,
            };
            match store.list(&unscoped, false) {
                Ok((rows, _)) => {
                    let feedback = rows
                        .iter()
                        .filter(|c| c.confidence.is_none() && c.updated_at.is_some())
                        .count();
                    if feedback < MIN_FEEDBACK_SAMPLES {
                        handle.fail(&format!(
                            "not enough feedback for retraining ({} of {} samples)",
                            feedback, MIN_FEEDBACK_SAMPLES
                        ));
                    } else {
                        handle.set_status(RetrainStatus::Completed);
                    }
                }
                Err(e) => handle.fail(&e.to_string()),
            }
        });
        Ok(job)
    }
}
