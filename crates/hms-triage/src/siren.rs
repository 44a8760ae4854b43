//! 警报器状态机
//!
//! 根据当前告警中的队列项决定警报器动作，本身不做任何 I/O。
//! 当前目标仍在告警时保持不变；目标解除后按队列顺序重新选择第一个告警项。

use hms_core::{QueueItem, QueueItemId};
use serde::{Deserialize, Serialize};

/// 警报器状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SirenState {
    Idle,
    Alarming { item_id: QueueItemId, bay_number: u32 },
}

/// 状态转换产生的命令
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SirenCommand {
    /// 立即播报并启动重复计时器
    Start { item_id: QueueItemId, bay_number: u32 },
    /// 取消旧计时器，为新目标立即播报并启动新计时器
    Retarget {
        previous: QueueItemId,
        item_id: QueueItemId,
        bay_number: u32,
    },
    /// 取消计时器并打断正在进行的播报
    Stop,
}

/// 警报器状态机
#[derive(Debug, Clone)]
pub struct SirenMachine {
    state: SirenState,
}

impl SirenMachine {
    pub fn new() -> Self {
        Self {
            state: SirenState::Idle,
        }
    }

    pub fn state(&self) -> SirenState {
        self.state
    }

    pub fn is_alarming(&self) -> bool {
        matches!(self.state, SirenState::Alarming { .. })
    }

    /// 根据按队列顺序排列的告警项重新评估
    pub fn evaluate(&mut self, alarming: &[QueueItem]) -> Option<SirenCommand> {
        match (self.state, alarming.first()) {
            (SirenState::Idle, None) => None,
            (SirenState::Idle, Some(first)) => {
                self.state = SirenState::Alarming {
                    item_id: first.id,
                    bay_number: first.bay_number,
                };
                Some(SirenCommand::Start {
                    item_id: first.id,
                    bay_number: first.bay_number,
                })
            }
            (SirenState::Alarming { .. }, None) => {
                self.state = SirenState::Idle;
                Some(SirenCommand::Stop)
            }
            (SirenState::Alarming { item_id, .. }, Some(first)) => {
                if alarming.iter().any(|item| item.id == item_id) {
                    return None;
                }
                self.state = SirenState::Alarming {
                    item_id: first.id,
                    bay_number: first.bay_number,
                };
                Some(SirenCommand::Retarget {
                    previous: item_id,
                    item_id: first.id,
                    bay_number: first.bay_number,
                })
            }
        }
    }

    /// 拆除时回到空闲
    pub fn reset(&mut self) -> Option<SirenCommand> {
        match self.state {
            SirenState::Idle => None,
            SirenState::Alarming { .. } => {
                self.state = SirenState::Idle;
                Some(SirenCommand::Stop)
            }
        }
    }
}

impl Default for SirenMachine {
    fn default() -> Self {
        Self::new()
    }
}
