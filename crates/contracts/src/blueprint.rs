//! PipelineBlueprint - Config Loader 输出
//!
//! 描述完整的同步管线：驱动流、各流的 Captor 配置与模拟数据源。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CaptorConfig, Role, StreamId};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的管线配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 同步器配置
    pub sync: SyncConfig,

    /// 流定义列表 (声明顺序即输出顺序)
    pub streams: Vec<StreamConfig>,
}

/// 同步器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 驱动流 ID
    pub driver: StreamId,

    /// 单次 capture 的截止时间 (毫秒)，缺省为不限
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    /// 驱动窗口上界的下限
    #[serde(default)]
    pub lower_bound: Option<i64>,
}

impl SyncConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// 单个流
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 唯一标识符
    pub id: StreamId,

    /// Captor 配置
    pub captor: CaptorConfig,

    /// 模拟数据源
    #[serde(default)]
    pub source: SourceConfig,
}

impl StreamConfig {
    pub fn role(&self) -> Role {
        self.captor.policy.role()
    }
}

/// 模拟数据源：在 `phase + k * period` 处产生 dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 时间戳步长，必须 > 0
    #[serde(default = "default_period")]
    pub period: i64,

    /// 第一条的时间戳
    #[serde(default)]
    pub phase: i64,

    /// 每 k 条丢一条，用于模拟丢帧
    #[serde(default)]
    pub drop_every: Option<u32>,

    /// 载荷字节数
    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: usize,
}

fn default_period() -> i64 {
    100
}

fn default_payload_bytes() -> usize {
    64
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            phase: 0,
            drop_every: None,
            payload_bytes: default_payload_bytes(),
        }
    }
}

impl PipelineBlueprint {
    pub fn stream(&self, id: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.id == id)
    }

    pub fn driver_stream(&self) -> Option<&StreamConfig> {
        self.stream(&self.sync.driver)
    }

    /// 除驱动流以外的流，保持声明顺序
    pub fn follower_streams(&self) -> impl Iterator<Item = &StreamConfig> {
        self.streams.iter().filter(move |s| s.id != self.sync.driver)
    }
}
