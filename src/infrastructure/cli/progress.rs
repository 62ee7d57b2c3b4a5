//! 终端进度条

use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ProgressSink;
use crate::domain::batch::{InferenceResult, ItemOutcome};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// 基于 indicatif 的进度展示：总进度条 + 当前条目的估算百分比
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    /// 不输出到终端（--no-progress）
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for IndicatifProgress {
    fn item_started(&self, index: usize, total: usize, item_key: &str, _prompt: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index as u64);
        self.bar.set_message(format!("{} 0%", item_key));
    }

    fn progress(&self, item_key: &str, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
        self.bar.set_message(format!("{} {}%", item_key, percent));
    }

    fn item_finished(&self, result: &InferenceResult) {
        self.bar.inc(1);
        match &result.outcome {
            ItemOutcome::Succeeded { filename } => {
                self.bar
                    .println(format!("ok    {} -> {}", result.item_key, filename.display()));
            }
            ItemOutcome::Failed { reason, error } => {
                self.bar.println(format!(
                    "fail  {} [{}] {}",
                    result.item_key,
                    reason.as_str(),
                    error
                ));
            }
        }
    }
}
