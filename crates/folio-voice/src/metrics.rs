//! Per-response model metrics and session-level usage aggregation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Metrics for a single realtime model response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeModelMetrics {
    pub label: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Time to first output delta, if any output was streamed.
    pub ttft_ms: Option<f64>,
    pub duration_ms: f64,
    pub cancelled: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub input_cached_tokens: u64,
    pub input_text_tokens: u64,
    pub input_audio_tokens: u64,
    pub output_text_tokens: u64,
    pub output_audio_tokens: u64,
}

impl RealtimeModelMetrics {
    /// Metrics with no tokens counted, timestamped now.
    pub fn empty(label: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            request_id: request_id.into(),
            timestamp: Utc::now(),
            ttft_ms: None,
            duration_ms: 0.0,
            cancelled: false,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            input_cached_tokens: 0,
            input_text_tokens: 0,
            input_audio_tokens: 0,
            output_text_tokens: 0,
            output_audio_tokens: 0,
        }
    }
}

/// Fired by an agent session after every provider response.
#[derive(Debug, Clone)]
pub struct MetricsCollectedEvent {
    pub metrics: RealtimeModelMetrics,
}

/// Emits one structured log line for `metrics`.
pub fn log_metrics(metrics: &RealtimeModelMetrics) {
    tracing::info!(
        model = %metrics.label,
        request_id = %metrics.request_id,
        ttft_ms = metrics.ttft_ms.unwrap_or(-1.0),
        duration_ms = metrics.duration_ms,
        cancelled = metrics.cancelled,
        input_tokens = metrics.input_tokens,
        cached_tokens = metrics.input_cached_tokens,
        output_tokens = metrics.output_tokens,
        total_tokens = metrics.total_tokens,
        "realtime model metrics"
    );
}

/// Running totals across all responses of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSummary {
    pub responses: u64,
    pub llm_prompt_tokens: u64,
    pub llm_prompt_cached_tokens: u64,
    pub llm_completion_tokens: u64,
    pub llm_input_audio_tokens: u64,
    pub llm_output_audio_tokens: u64,
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UsageSummary(responses={}, llm_prompt_tokens={}, llm_prompt_cached_tokens={}, \
             llm_completion_tokens={}, llm_input_audio_tokens={}, llm_output_audio_tokens={})",
            self.responses,
            self.llm_prompt_tokens,
            self.llm_prompt_cached_tokens,
            self.llm_completion_tokens,
            self.llm_input_audio_tokens,
            self.llm_output_audio_tokens
        )
    }
}

/// Aggregates [`RealtimeModelMetrics`] into a [`UsageSummary`].
///
/// Uses `std::sync::Mutex`: updates are a handful of additions and never
/// span an `.await`.
#[derive(Debug, Default)]
pub struct UsageCollector {
    summary: Mutex<UsageSummary>,
}

impl UsageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&self, metrics: &RealtimeModelMetrics) {
        let mut summary = match self.summary.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        summary.responses += 1;
        summary.llm_prompt_tokens += metrics.input_tokens;
        summary.llm_prompt_cached_tokens += metrics.input_cached_tokens;
        summary.llm_completion_tokens += metrics.output_tokens;
        summary.llm_input_audio_tokens += metrics.input_audio_tokens;
        summary.llm_output_audio_tokens += metrics.output_audio_tokens;
    }

    pub fn summary(&self) -> UsageSummary {
        match self.summary.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(input: u64, cached: u64, output: u64, out_audio: u64) -> RealtimeModelMetrics {
        RealtimeModelMetrics {
            input_tokens: input,
            input_cached_tokens: cached,
            output_tokens: output,
            output_audio_tokens: out_audio,
            total_tokens: input + output,
            ..RealtimeModelMetrics::empty("test", "resp_1")
        }
    }

    #[test]
    fn collector_sums_responses() {
        let collector = UsageCollector::new();
        collector.collect(&metrics(100, 20, 40, 0));
        collector.collect(&metrics(50, 0, 10, 30));

        let summary = collector.summary();
        assert_eq!(summary.responses, 2);
        assert_eq!(summary.llm_prompt_tokens, 150);
        assert_eq!(summary.llm_prompt_cached_tokens, 20);
        assert_eq!(summary.llm_completion_tokens, 50);
        assert_eq!(summary.llm_output_audio_tokens, 30);
    }

    #[test]
    fn empty_collector_reports_zero() {
        assert_eq!(UsageCollector::new().summary(), UsageSummary::default());
    }

    #[test]
    fn summary_display_lists_fields() {
        let summary = UsageSummary {
            responses: 3,
            llm_prompt_tokens: 12,
            ..UsageSummary::default()
        };
        let text = summary.to_string();
        assert!(text.contains("responses=3"));
        assert!(text.contains("llm_prompt_tokens=12"));
    }
}
