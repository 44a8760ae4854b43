//! # 急诊分诊模块
//!
//! 提供急诊候诊与入院的核心功能，包括：
//! - 分诊优先级模型：危急 < 紧急 < 非紧急
//! - 候诊队列：按优先级稳定排序，支持生命体征更新与告警标记
//! - 床位池：串行化的空闲床位分配
//! - 入院协调：床位占用与出队原子完成
//! - 生命体征恶化模拟与告警通知器

pub mod admission;
pub mod beds;
pub mod desk;
pub mod notifier;
pub mod priority;
pub mod queue;
pub mod simulator;
pub mod siren;
pub mod task;

// 重新导出主要类型
pub use admission::{Admission, AdmissionCoordinator};
pub use beds::{BedBoard, BedPool, WardCensus};
pub use desk::{DeskConfig, DeskOverview, TriageDesk};
pub use notifier::{AlarmEvent, AlarmEventKind, AlarmNotifier, AudioSink, TracingAudioSink};
pub use queue::{ErQueue, QueueStore};
pub use simulator::{
    DeteriorationSource, RandomDeterioration, ScriptedDeterioration, SimulatorConfig,
    VitalsSimulator,
};
pub use siren::{SirenCommand, SirenMachine, SirenState};
pub use task::{BackgroundTask, TaskGauge};
