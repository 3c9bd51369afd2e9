//! 捕获指标收集模块
//!
//! 记录 Synchronizer 的捕获结果、各流的数据量与溢出，并在内存中聚合统计。
//! 引擎内部的每流计数 (`flow_captures_total`, `flow_queue_depth`,
//! `flow_dispatch_overflow_total`) 由 sync_engine 直接上报。

use std::collections::BTreeMap;

use contracts::State;
use metrics::{counter, gauge, histogram};

/// 记录一次 synchronizer 捕获
///
/// `latency_ms` 为 capture 调用耗时 (含轮询等待)。
pub fn record_capture_outcome(state: State, latency_ms: f64) {
    counter!("flow_pipeline_captures_total", "state" => state.as_str()).increment(1);
    histogram!("flow_capture_latency_ms", "state" => state.as_str()).record(latency_ms);
}

/// 记录生产者写入一条 dispatch
pub fn record_dispatch_produced(stream: &str) {
    counter!("flow_dispatch_produced_total", "stream" => stream.to_string()).increment(1);
}

/// 记录溢出监视器回调
pub fn record_overflow(stream: &str) {
    counter!("flow_overflow_observed_total", "stream" => stream.to_string()).increment(1);
}

/// 记录队列深度
pub fn record_queue_depth(stream: &str, depth: usize) {
    gauge!("flow_pipeline_queue_depth", "stream" => stream.to_string()).set(depth as f64);
}

/// 捕获指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CaptureMetricsAggregator {
    /// 各状态次数
    pub state_counts: BTreeMap<State, u64>,

    /// 各流捕获到的 dispatch 数
    pub captured_per_stream: BTreeMap<String, u64>,

    /// 各流溢出次数
    pub overflow_per_stream: BTreeMap<String, u64>,

    /// 捕获耗时统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 驱动窗口跨度统计 (时间戳刻度)
    pub window_span_stats: RunningStats,
}

impl CaptureMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新一次捕获结果
    ///
    /// `window_span` 为 `upper - lower`，驱动没有给出窗口时为 `None`。
    pub fn record(&mut self, state: State, latency_ms: f64, window_span: Option<f64>) {
        *self.state_counts.entry(state).or_insert(0) += 1;
        self.latency_stats.push(latency_ms);
        if let (State::Primed, Some(span)) = (state, window_span) {
            self.window_span_stats.push(span);
        }
    }

    /// 记录某个流在一次 PRIMED 捕获中的 dispatch 数
    pub fn record_captured(&mut self, stream: &str, count: usize) {
        *self.captured_per_stream.entry(stream.to_string()).or_insert(0) += count as u64;
    }

    pub fn record_overflow(&mut self, stream: &str) {
        *self.overflow_per_stream.entry(stream.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, state: State) -> u64 {
        self.state_counts.get(&state).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u64 {
        self.state_counts.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let total = self.total_attempts();
        let rate = |n: u64| {
            if total > 0 {
                n as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        };

        MetricsSummary {
            total_attempts: total,
            primed: self.count(State::Primed),
            retry: self.count(State::Retry),
            abort: self.count(State::Abort),
            timeout: self.count(State::Timeout),
            primed_rate: rate(self.count(State::Primed)),
            abort_rate: rate(self.count(State::Abort)),
            latency_ms: StatsSummary::from(&self.latency_stats),
            window_span: StatsSummary::from(&self.window_span_stats),
            captured_per_stream: self.captured_per_stream.clone(),
            overflow_per_stream: self.overflow_per_stream.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_attempts: u64,
    pub primed: u64,
    pub retry: u64,
    pub abort: u64,
    pub timeout: u64,
    pub primed_rate: f64,
    pub abort_rate: f64,
    pub latency_ms: StatsSummary,
    pub window_span: StatsSummary,
    pub captured_per_stream: BTreeMap<String, u64>,
    pub overflow_per_stream: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Metrics Summary ===")?;
        writeln!(f, "Capture attempts: {}", self.total_attempts)?;
        writeln!(f, "Primed: {} ({:.2}%)", self.primed, self.primed_rate)?;
        writeln!(f, "Aborted: {} ({:.2}%)", self.abort, self.abort_rate)?;
        writeln!(f, "Retry: {}, Timeout: {}", self.retry, self.timeout)?;
        writeln!(f, "Capture latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Window span: {}", self.window_span)?;

        if !self.captured_per_stream.is_empty() {
            writeln!(f, "Captured dispatches:")?;
            for (stream, count) in &self.captured_per_stream {
                writeln!(f, "  {stream}: {count}")?;
            }
        }
        if !self.overflow_per_stream.is_empty() {
            writeln!(f, "Overflowed dispatches:")?;
            for (stream, count) in &self.overflow_per_stream {
                writeln!(f, "  {stream}: {count}")?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
