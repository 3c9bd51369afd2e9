//! # Sync Engine
//!
//! 多流数据同步捕获引擎。
//!
//! 负责：
//! - 每个流一个有序、有界的 `DispatchQueue`
//! - 可插拔的捕获策略（驱动 / 跟随）
//! - 无等待或有界轮询的加锁方式
//! - `Synchronizer` 原子地捕获驱动流与全部跟随流
//!
//! ## 使用示例
//!
//! ```
//! use std::sync::Arc;
//! use sync_engine::{Batch, Captor, Deadline, Ranged, State, Synchronizer};
//!
//! let camera = Arc::new(
//!     Captor::<i64, &str>::builder("camera")
//!         .capacity(8)
//!         .policy(Batch::new(2).unwrap())
//!         .build()
//!         .unwrap(),
//! );
//! let lidar = Arc::new(
//!     Captor::builder("lidar")
//!         .capacity(8)
//!         .policy(Ranged::new(0))
//!         .build()
//!         .unwrap(),
//! );
//!
//! for t in [5, 10, 15] {
//!     camera.insert(t, "frame");
//! }
//! for t in [4, 6, 9, 14, 20] {
//!     lidar.insert(t, "scan");
//! }
//!
//! let sync = Synchronizer::new(camera, vec![lidar]).unwrap();
//! let mut outputs = vec![Vec::new(), Vec::new()];
//! let result = sync.capture(&mut outputs, i64::MIN, Deadline::never()).unwrap();
//!
//! assert_eq!(result.state, State::Primed);
//! assert_eq!(outputs[1].len(), 2);
//! ```

mod captor;
mod driver;
mod error;
mod follower;
mod lock;
mod policy;
mod queue;
mod synchronizer;

pub use captor::{Captor, CaptorBuilder, OverflowMonitor};
pub use driver::{Batch, Chunk, Next, Throttled};
pub use error::{EngineError, Result};
pub use follower::{
    AnyBefore, Before, ClosestBefore, CountBefore, Exact, Latched, MatchedStamp, Ranged,
};
pub use lock::LockingStrategy;
pub use policy::{CapturePolicy, Located, Policy};
pub use queue::{Admission, DispatchQueue};
pub use synchronizer::Synchronizer;

// Re-export contracts types
pub use contracts::{
    CaptorConfig, CaptureRange, CaptureResult, Deadline, Dispatch, Insertion, OverflowPolicy,
    PolicyConfig, Role, Stamp, State, StreamId,
};
