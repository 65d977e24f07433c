/*!
 * Mock corrector for testing.
 *
 * This module provides a corrector that simulates different behaviors:
 * - `MockCorrector::echo()` - Always succeeds, returns the input unchanged
 * - `MockCorrector::transform(f)` - Always succeeds, returns `f(input)`
 * - `MockCorrector::scripted(replies)` - Replays canned results, then echoes
 * - `MockCorrector::intermittent(n)` - Every nth call fails transiently
 * - `MockCorrector::failing()` - Always fails fatally
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::correction::Corrector;
use crate::errors::CorrectionError;

/// Behavior mode for the mock corrector
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Returns the input unchanged
    Echo,
    /// Returns the input passed through a function
    Transform(fn(&str) -> String),
    /// Pops the next scripted result; echoes once the script is exhausted
    Scripted,
    /// Fails transiently on every Nth call, echoes otherwise
    Intermittent { fail_every: usize },
    /// Always fails with a fatal error
    Failing,
}

/// Deterministic corrector for tests and benchmarks
#[derive(Debug, Clone)]
pub struct MockCorrector {
    /// Behavior mode
    behavior: MockBehavior,
    /// Call counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Inputs received, in call order
    calls: Arc<Mutex<Vec<String>>>,
    /// Remaining scripted results
    script: Arc<Mutex<VecDeque<Result<String, CorrectionError>>>>,
}

impl MockCorrector {
    /// Create a new mock corrector with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a corrector that returns its input unchanged
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create a corrector that applies `transform` to its input
    pub fn transform(transform: fn(&str) -> String) -> Self {
        Self::new(MockBehavior::Transform(transform))
    }

    /// Create a corrector that replays `replies` in order
    pub fn scripted(replies: Vec<Result<String, CorrectionError>>) -> Self {
        let corrector = Self::new(MockBehavior::Scripted);
        corrector.script.lock().extend(replies);
        corrector
    }

    /// Create a corrector that fails transiently every `fail_every` calls
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a corrector that always fails fatally
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Inputs received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Corrector for MockCorrector {
    async fn correct(&self, chunk_text: &str) -> Result<String, CorrectionError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(chunk_text.to_string());

        match self.behavior {
            MockBehavior::Echo => Ok(chunk_text.to_string()),

            MockBehavior::Transform(transform) => Ok(transform(chunk_text)),

            MockBehavior::Scripted => self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(chunk_text.to_string())),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(CorrectionError::Transient(format!(
                        "Simulated intermittent failure (request #{})",
                        count + 1
                    )))
                } else {
                    Ok(chunk_text.to_string())
                }
            }

            MockBehavior::Failing => Err(CorrectionError::Fatal(
                "Simulated corrector failure".to_string(),
            )),
        }
    }
}
