// Optimization suggestions derived from a finished run
//
// Rules are evaluated in order and each contributes at most one message,
// except the call-frequency rule which emits one per qualifying hotspot.
// When no rule fires a single fallback message is returned.

use crate::report::RunResult;
use serde::{Deserialize, Serialize};

/// Message returned when no rule fires
pub const BALANCED_MESSAGE: &str =
    "No obvious performance bottlenecks detected.\nThe program appears well-balanced.";

/// Thresholds for the suggestion rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRules {
    /// Share of execution time above which the top hotspot is called out
    pub dominant_share: f64,
    /// Average CPU percentage considered CPU-bound
    pub high_cpu_percent: f64,
    /// Peak memory in MB considered high
    pub high_memory_mb: f64,
    /// Call count above which a hotspot is considered frequently called
    pub frequent_calls: u64,
}

impl Default for SuggestionRules {
    fn default() -> Self {
        Self {
            dominant_share: 0.6,
            high_cpu_percent: 80.0,
            high_memory_mb: 500.0,
            frequent_calls: 1000,
        }
    }
}

/// Rule-based suggestion generator
#[derive(Debug, Clone, Default)]
pub struct SuggestionEngine {
    rules: SuggestionRules,
}

impl SuggestionEngine {
    pub fn new(rules: SuggestionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SuggestionRules {
        &self.rules
    }

    /// Suggestions for `result`, never empty
    pub fn generate(&self, result: &RunResult) -> Vec<String> {
        let mut suggestions = Vec::new();

        if let Some(top) = result.top_hotspot() {
            let share = if result.execution_time > 0.0 {
                top.total_time / result.execution_time
            } else {
                0.0
            };
            if share > self.rules.dominant_share {
                suggestions.push(format!(
                    "Function '{}' dominates runtime ({:.0}%).\n\
                     Consider optimizing its algorithm or reducing repeated work.",
                    top.identity,
                    share * 100.0
                ));
            }
        }

        if result.avg_cpu_percent > self.rules.high_cpu_percent {
            suggestions.push(
                "High average CPU usage detected.\nThe workload appears CPU-bound.\n\
                 Consider multiprocessing or algorithmic optimizations."
                    .to_string(),
            );
        }

        if result.peak_memory_mb > self.rules.high_memory_mb {
            suggestions.push(
                "High peak memory usage detected.\n\
                 Investigate large in-memory data structures or streaming approaches."
                    .to_string(),
            );
        }

        for hotspot in &result.hotspots {
            if hotspot.calls > self.rules.frequent_calls {
                suggestions.push(format!(
                    "Function '{}' is called frequently ({} calls).\n\
                     Consider caching or batching operations.",
                    hotspot.identity, hotspot.calls
                ));
            }
        }

        if suggestions.is_empty() {
            suggestions.push(BALANCED_MESSAGE.to_string());
        }

        tracing::debug!(count = suggestions.len(), "Generated suggestions");
        suggestions
    }
}
