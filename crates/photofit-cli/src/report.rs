//! Human and JSON renderings of command results

use photofit_core::{AttemptKind, Compressed, CompressionPath, PlannedAttempt};
use serde::Serialize;

/// Outcome of `photofit compress`
#[derive(Debug, Clone, Serialize)]
pub struct CompressionReport {
    /// Input as given
    pub source: String,
    /// Where the result lives
    pub output: String,
    /// Budget in force
    pub max_bytes: u64,
    /// Engine result
    #[serde(flatten)]
    pub result: Compressed,
}

impl CompressionReport {
    /// Whether the result fits the budget
    #[inline]
    #[must_use]
    pub fn within_budget(&self) -> bool {
        self.result.bytes <= self.max_bytes
    }

    /// Plain-text summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let path = match self.result.path {
            CompressionPath::FastPath => "fast path".to_string(),
            CompressionPath::Iterative { attempt } => format!("iterative, attempt {attempt}"),
            CompressionPath::FinalFallback => "final fallback".to_string(),
        };

        out.push_str(&format!("Source:  {}\n", self.source));
        out.push_str(&format!("Output:  {}\n", self.output));
        out.push_str(&format!(
            "Size:    {} bytes (budget {}{})\n",
            self.result.bytes,
            self.max_bytes,
            if self.within_budget() { "" } else { ", exceeded" }
        ));
        out.push_str(&format!("Pixels:  {}x{}\n", self.result.width, self.result.height));
        out.push_str(&format!("Path:    {path}\n"));
        out.push_str("Attempts:\n");
        for (i, attempt) in self.result.attempts.iter().enumerate() {
            let kind = match attempt.kind {
                AttemptKind::FastPath => "fast",
                AttemptKind::Iterative => "iter",
                AttemptKind::FinalFallback => "final",
            };
            out.push_str(&format!(
                "  {:>2}. {kind:<5} q={:.2} max={:>5}px -> {} bytes ({}x{})\n",
                i + 1,
                attempt.quality,
                attempt.max_dimension,
                attempt.result_bytes,
                attempt.width,
                attempt.height
            ));
        }
        out
    }
}

/// Plain-text rendering of a worst-case schedule
#[must_use]
pub fn plan_text(max_bytes: u64, plan: &[PlannedAttempt]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Budget: {max_bytes} bytes\n"));
    for step in plan {
        out.push_str(&format!(
            "  {:>2}. {:<5} q={:.2} max={:>5}px\n",
            step.call,
            if step.fallback { "final" } else { "iter" },
            step.quality,
            step.max_dimension
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use photofit_core::{AttemptRecord, CompressionBudget, ResourceRef};

    fn report(bytes: u64, path: CompressionPath) -> CompressionReport {
        CompressionReport {
            source: "/captures/a.png".to_string(),
            output: "/out/a.jpg".to_string(),
            max_bytes: 1000,
            result: Compressed {
                resource: ResourceRef::new("/tmp/photofit-x.jpg"),
                bytes,
                width: 1000,
                height: 750,
                path,
                attempts: vec![AttemptRecord {
                    kind: AttemptKind::Iterative,
                    quality: 0.8,
                    max_dimension: 3000,
                    result_bytes: bytes,
                    width: 1000,
                    height: 750,
                }],
            },
        }
    }

    #[test]
    fn text_names_path_and_attempts() {
        let text = report(900, CompressionPath::Iterative { attempt: 1 }).generate_text();
        assert!(text.contains("iterative, attempt 1"));
        assert!(text.contains("q=0.80 max= 3000px -> 900 bytes (1000x750)"));
        assert!(!text.contains("exceeded"));
    }

    #[test]
    fn text_flags_over_budget_fallback() {
        let text = report(1200, CompressionPath::FinalFallback).generate_text();
        assert!(text.contains("final fallback"));
        assert!(text.contains("Size:    1200 bytes (budget 1000, exceeded)\n"));
        assert!(text.lines().any(|l| l == "Attempts:"));
    }

    #[test]
    fn json_flattens_result() {
        let value = serde_json::to_value(report(900, CompressionPath::FastPath)).unwrap();
        assert_eq!(value["output"], "/out/a.jpg");
        assert_eq!(value["bytes"], 900);
        assert_eq!(value["resource"], "/tmp/photofit-x.jpg");
        assert_eq!(value["path"]["path"], "fast-path");
    }

    #[test]
    fn plan_lists_every_call() {
        let budget = CompressionBudget::default();
        let text = plan_text(budget.max_bytes, &photofit_core::plan(&budget));
        assert_eq!(text.lines().count(), 1 + budget.max_codec_calls() as usize);
        assert!(text.contains("final q=0.50 max= 1000px"));
    }
}
