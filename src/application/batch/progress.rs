//! Progress Estimator - 基于耗时的进度估算
//!
//! 仅用于展示：按固定间隔采样已耗时间，输出 min(elapsed / estimate, 0.99)，
//! 结束时恰好输出一次 1.0。不影响派发本身。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::application::ports::ProgressSink;

/// 默认采样间隔
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// 进度估算器
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    estimate: Option<Duration>,
    interval: Duration,
}

impl ProgressEstimator {
    /// estimate 为 None 或 0 时不输出任何进度
    pub fn new(estimate: Option<Duration>) -> Self {
        Self {
            estimate: estimate.filter(|d| !d.is_zero()),
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.estimate.is_some()
    }

    /// 开始一个条目的进度估算
    pub fn start(&self, item_key: &str, sink: Arc<dyn ProgressSink>) -> ProgressHandle {
        let Some(estimate) = self.estimate else {
            return ProgressHandle::noop();
        };

        let shared = Arc::new(Shared {
            item_key: item_key.to_string(),
            sink,
            finished: Mutex::new(false),
        });

        let started = Instant::now();
        let interval = self.interval;
        let ticker_shared = Arc::clone(&shared);
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let fraction =
                    (started.elapsed().as_secs_f64() / estimate.as_secs_f64()).min(0.99);
                if !ticker_shared.emit_tick(fraction) {
                    break;
                }
            }
        });

        ProgressHandle {
            shared: Some(shared),
            ticker: Some(ticker),
        }
    }
}

struct Shared {
    item_key: String,
    sink: Arc<dyn ProgressSink>,
    finished: Mutex<bool>,
}

impl Shared {
    /// 未结束时输出一次采样，返回是否应继续
    fn emit_tick(&self, fraction: f64) -> bool {
        match self.finished.lock() {
            Ok(finished) if !*finished => {
                self.sink.progress(&self.item_key, fraction);
                true
            }
            _ => false,
        }
    }

    fn emit_final(&self) {
        if let Ok(mut finished) = self.finished.lock() {
            if !*finished {
                *finished = true;
                self.sink.progress(&self.item_key, 1.0);
            }
        }
    }
}

/// 单个条目的进度句柄；`finish` 或 drop 时输出 1.0
pub struct ProgressHandle {
    shared: Option<Arc<Shared>>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    fn noop() -> Self {
        Self {
            shared: None,
            ticker: None,
        }
    }

    /// 结束估算（成功或失败均调用）
    pub fn finish(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.emit_final();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        fractions: Mutex<Vec<f64>>,
    }

    impl RecordingSink {
        fn fractions(&self) -> Vec<f64> {
            self.fractions.lock().unwrap().clone()
        }
    }

    impl ProgressSink for RecordingSink {
        fn progress(&self, _item_key: &str, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }
    }

    #[tokio::test]
    async fn test_monotonic_and_single_completion() {
        let sink = Arc::new(RecordingSink::default());
        let estimator = ProgressEstimator::new(Some(Duration::from_millis(200)))
            .with_interval(Duration::from_millis(20));

        let handle = estimator.start("a", sink.clone());
        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.finish();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let fractions = sink.fractions();
        assert!(fractions.len() >= 2);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.iter().filter(|f| **f == 1.0).count(), 1);
        assert_eq!(*fractions.last().unwrap(), 1.0);
        assert!(fractions[..fractions.len() - 1].iter().all(|f| *f <= 0.99));
    }

    #[tokio::test]
    async fn test_drop_emits_completion() {
        let sink = Arc::new(RecordingSink::default());
        let estimator = ProgressEstimator::new(Some(Duration::from_secs(10)));

        {
            let _handle = estimator.start("a", sink.clone());
        }

        assert_eq!(sink.fractions(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_disabled_without_estimate() {
        let sink = Arc::new(RecordingSink::default());
        let estimator = ProgressEstimator::new(None);
        assert!(!estimator.is_enabled());

        let handle = estimator.start("a", sink.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.finish();

        assert!(sink.fractions().is_empty());
    }
}
