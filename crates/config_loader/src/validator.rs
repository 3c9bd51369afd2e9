//! 配置校验模块
//!
//! 校验规则：
//! - stream id 唯一且非空
//! - 驱动流存在且使用驱动策略，其余流使用跟随策略，至少一个跟随流
//! - capacity > 0，Batch/CountBefore 的数量 > 0 且不超过容量
//! - Chunk/ClosestBefore 的时长 > 0，偏移量 >= 0
//! - 轮询间隔 > 0
//! - 数据源 period > 0，drop_every >= 2

use std::collections::HashSet;

use contracts::{
    ContractError, LockingConfig, PipelineBlueprint, PolicyConfig, Role, StreamConfig,
};

/// 校验 PipelineBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_stream_ids(blueprint)?;
    validate_roles(blueprint)?;
    for stream in &blueprint.streams {
        validate_captor(stream)?;
        validate_source(stream)?;
    }
    Ok(())
}

/// 可运行但可能不符合预期的配置
pub fn warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    let polling = blueprint
        .streams
        .iter()
        .any(|s| matches!(s.captor.locking, LockingConfig::Polling { .. }));
    if polling && blueprint.sync.deadline_ms.is_none() {
        warnings.push(
            "polling captors without sync.deadline_ms wait until the window is satisfied"
                .to_string(),
        );
    }

    if let Some(driver) = blueprint.driver_stream() {
        for stream in blueprint.follower_streams() {
            let span = stream.source.period.saturating_mul(stream.captor.capacity as i64);
            if span < driver.source.period {
                warnings.push(format!(
                    "streams[{}]: capacity {} holds {} ticks, less than one driver period ({})",
                    stream.id, stream.captor.capacity, span, driver.source.period
                ));
            }
        }
    }

    warnings
}

fn validate_stream_ids(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, stream) in blueprint.streams.iter().enumerate() {
        if stream.id.is_empty() {
            return Err(ContractError::config_validation(
                format!("streams[{idx}].id"),
                "stream id cannot be empty",
            ));
        }
        if !seen.insert(stream.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("streams[id={}]", stream.id),
                "duplicate stream id",
            ));
        }
    }
    Ok(())
}

fn validate_roles(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let driver = blueprint.driver_stream().ok_or_else(|| {
        ContractError::config_validation(
            "sync.driver",
            format!("driver stream '{}' is not declared", blueprint.sync.driver),
        )
    })?;

    if driver.role() != Role::Driver {
        return Err(ContractError::config_validation(
            format!("streams[{}].captor.policy", driver.id),
            format!(
                "driver stream needs a driver policy, got '{}'",
                driver.captor.policy.name()
            ),
        ));
    }

    let mut followers = 0;
    for stream in blueprint.follower_streams() {
        if stream.role() != Role::Follower {
            return Err(ContractError::config_validation(
                format!("streams[{}].captor.policy", stream.id),
                format!(
                    "only '{}' may use a driver policy, got '{}'",
                    blueprint.sync.driver,
                    stream.captor.policy.name()
                ),
            ));
        }
        followers += 1;
    }

    if followers == 0 {
        return Err(ContractError::config_validation(
            "streams",
            "at least one follower stream is required",
        ));
    }
    Ok(())
}

fn validate_captor(stream: &StreamConfig) -> Result<(), ContractError> {
    let captor = &stream.captor;
    let field = |name: &str| format!("streams[{}].captor.{name}", stream.id);

    if captor.capacity == 0 {
        return Err(ContractError::config_validation(
            field("capacity"),
            "capacity must be > 0",
        ));
    }

    if let LockingConfig::Polling { interval_ms: 0 } = captor.locking {
        return Err(ContractError::config_validation(
            field("locking.interval_ms"),
            "polling interval must be > 0",
        ));
    }

    let positive = |name: &str, value: i64| {
        if value > 0 {
            Ok(())
        } else {
            Err(ContractError::config_validation(
                field(name),
                format!("{name} must be > 0, got {value}"),
            ))
        }
    };
    let non_negative = |name: &str, value: i64| {
        if value >= 0 {
            Ok(())
        } else {
            Err(ContractError::config_validation(
                field(name),
                format!("{name} must be >= 0, got {value}"),
            ))
        }
    };
    let count = |name: &str, value: usize| {
        if value == 0 {
            Err(ContractError::config_validation(
                field(name),
                format!("{name} must be > 0"),
            ))
        } else if value > captor.capacity {
            Err(ContractError::config_validation(
                field(name),
                format!(
                    "{name} ({value}) exceeds capacity ({}) and can never be satisfied",
                    captor.capacity
                ),
            ))
        } else {
            Ok(())
        }
    };

    match captor.policy {
        PolicyConfig::Next => Ok(()),
        PolicyConfig::Batch { size } => count("policy.size", size),
        PolicyConfig::Chunk { duration } => positive("policy.duration", duration),
        PolicyConfig::Throttled { min_period } => non_negative("policy.min_period", min_period),
        PolicyConfig::Before { delay }
        | PolicyConfig::AnyBefore { delay }
        | PolicyConfig::Ranged { delay } => non_negative("policy.delay", delay),
        PolicyConfig::ClosestBefore { period, delay } => {
            positive("policy.period", period)?;
            non_negative("policy.delay", delay)
        }
        PolicyConfig::CountBefore { count: n, delay } => {
            count("policy.count", n)?;
            non_negative("policy.delay", delay)
        }
        PolicyConfig::Latched { min_period } => non_negative("policy.min_period", min_period),
        PolicyConfig::MatchedStamp { .. } | PolicyConfig::Exact => Ok(()),
    }
}

fn validate_source(stream: &StreamConfig) -> Result<(), ContractError> {
    let source = &stream.source;
    if source.period <= 0 {
        return Err(ContractError::config_validation(
            format!("streams[{}].source.period", stream.id),
            format!("period must be > 0, got {}", source.period),
        ));
    }
    if let Some(k) = source.drop_every {
        if k < 2 {
            return Err(ContractError::config_validation(
                format!("streams[{}].source.drop_every", stream.id),
                format!("drop_every must be >= 2, got {k}"),
            ));
        }
    }
    Ok(())
}
