//! CaptorConfig - 单个流的捕获配置
//!
//! 容量、溢出策略、加锁方式与捕获策略。偏移量参数 (delay/period/duration)
//! 使用与时间戳相同的刻度，默认为 `i64`。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 队列满时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 丢弃最旧的 dispatch
    #[default]
    EvictOldest,
    /// 拒绝新到达的 dispatch
    RejectNewest,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::EvictOldest => "evict_oldest",
            OverflowPolicy::RejectNewest => "reject_newest",
        }
    }
}

/// 加锁方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LockingConfig {
    /// 只检查一次，未满足立即返回 RETRY
    #[default]
    NoWait,
    /// 轮询直到满足或超过截止时间
    Polling {
        /// 轮询间隔 (毫秒)，必须 > 0
        interval_ms: u64,
    },
}

impl LockingConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            LockingConfig::NoWait => None,
            LockingConfig::Polling { interval_ms } => Some(Duration::from_millis(*interval_ms)),
        }
    }
}

/// 策略在同步器中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 产生窗口
    Driver,
    /// 按窗口取数
    Follower,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Follower => "follower",
        }
    }
}

/// MatchedStamp 的锚点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAnchor {
    /// 窗口下界
    #[default]
    Lower,
    /// 窗口上界
    Upper,
}

/// 捕获策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "snake_case",
    bound(deserialize = "O: Deserialize<'de> + Default")
)]
pub enum PolicyConfig<O = i64> {
    // ===== Driver =====
    /// 最旧的一条
    Next,
    /// 连续 N 条
    Batch { size: usize },
    /// [oldest, oldest + duration)
    Chunk { duration: O },
    /// 与上一窗口间隔至少 min_period
    Throttled { min_period: O },

    // ===== Follower =====
    /// 边界之前的全部
    Before {
        #[serde(default)]
        delay: O,
    },
    /// 边界之前最近的一条 (可以没有)
    AnyBefore {
        #[serde(default)]
        delay: O,
    },
    /// 边界之前最近且距离不超过 period 的一条
    ClosestBefore {
        period: O,
        #[serde(default)]
        delay: O,
    },
    /// 边界之前最近的 N 条
    CountBefore {
        count: usize,
        #[serde(default)]
        delay: O,
    },
    /// 锁存最近一条，直到出现更新的
    Latched {
        #[serde(default)]
        min_period: O,
    },
    /// 时间戳与锚点完全相等
    MatchedStamp {
        #[serde(default)]
        anchor: MatchAnchor,
    },
    /// 窗口内最旧的一条，不等待窗口闭合
    Exact,
    /// 窗口内的全部
    Ranged {
        #[serde(default)]
        delay: O,
    },
}

impl<O> PolicyConfig<O> {
    pub fn role(&self) -> Role {
        match self {
            PolicyConfig::Next
            | PolicyConfig::Batch { .. }
            | PolicyConfig::Chunk { .. }
            | PolicyConfig::Throttled { .. } => Role::Driver,
            _ => Role::Follower,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyConfig::Next => "next",
            PolicyConfig::Batch { .. } => "batch",
            PolicyConfig::Chunk { .. } => "chunk",
            PolicyConfig::Throttled { .. } => "throttled",
            PolicyConfig::Before { .. } => "before",
            PolicyConfig::AnyBefore { .. } => "any_before",
            PolicyConfig::ClosestBefore { .. } => "closest_before",
            PolicyConfig::CountBefore { .. } => "count_before",
            PolicyConfig::Latched { .. } => "latched",
            PolicyConfig::MatchedStamp { .. } => "matched_stamp",
            PolicyConfig::Exact => "exact",
            PolicyConfig::Ranged { .. } => "ranged",
        }
    }
}

/// 单个 Captor 的完整配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "O: Deserialize<'de> + Default"))]
pub struct CaptorConfig<O = i64> {
    /// 队列容量，必须 > 0
    pub capacity: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    #[serde(default)]
    pub locking: LockingConfig,

    pub policy: PolicyConfig<O>,
}

impl<O> CaptorConfig<O> {
    pub fn new(capacity: usize, policy: PolicyConfig<O>) -> Self {
        Self {
            capacity,
            overflow: OverflowPolicy::default(),
            locking: LockingConfig::default(),
            policy,
        }
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_locking(mut self, locking: LockingConfig) -> Self {
        self.locking = locking;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_roles() {
        assert_eq!(PolicyConfig::<i64>::Next.role(), Role::Driver);
        assert_eq!(PolicyConfig::Chunk { duration: 5i64 }.role(), Role::Driver);
        assert_eq!(PolicyConfig::Ranged { delay: 0i64 }.role(), Role::Follower);
        assert_eq!(
            PolicyConfig::<i64>::MatchedStamp {
                anchor: MatchAnchor::Upper
            }
            .role(),
            Role::Follower
        );
    }

    #[test]
    fn test_tagged_json_defaults() {
        let config: CaptorConfig = serde_json::from_str(
            r#"{"capacity": 8, "policy": {"kind": "count_before", "count": 3}}"#,
        )
        .unwrap();

        assert_eq!(config.capacity, 8);
        assert_eq!(config.overflow, OverflowPolicy::EvictOldest);
        assert_eq!(config.locking, LockingConfig::NoWait);
        assert_eq!(
            config.policy,
            PolicyConfig::CountBefore { count: 3, delay: 0 }
        );
    }

    #[test]
    fn test_defaults_for_other_offset_types() {
        let config: CaptorConfig<u32> = serde_json::from_str(
            r#"{"capacity": 4, "policy": {"kind": "latched"}}"#,
        )
        .unwrap();
        assert_eq!(config.policy, PolicyConfig::Latched { min_period: 0u32 });

        let policy: PolicyConfig<Duration> =
            serde_json::from_str(r#"{"kind": "before"}"#).unwrap();
        assert_eq!(policy, PolicyConfig::Before { delay: Duration::ZERO });
    }

    #[test]
    fn test_unit_follower_variant() {
        let config: CaptorConfig = serde_json::from_str(r#"{"capacity": 2, "policy": {"kind": "exact"}}"#)
            .unwrap();
        assert_eq!(config.policy, PolicyConfig::Exact);
        assert_eq!(config.policy.role(), Role::Follower);
        assert_eq!(config.policy.name(), "exact");
    }

    #[test]
    fn test_polling_locking() {
        let config: CaptorConfig = serde_json::from_str(
            r#"{
                "capacity": 4,
                "overflow": "reject_newest",
                "locking": {"mode": "polling", "interval_ms": 2},
                "policy": {"kind": "batch", "size": 2}
            }"#,
        )
        .unwrap();

        assert_eq!(config.overflow, OverflowPolicy::RejectNewest);
        assert_eq!(
            config.locking.poll_interval(),
            Some(Duration::from_millis(2))
        );
        assert_eq!(config.policy.name(), "batch");
    }
}
