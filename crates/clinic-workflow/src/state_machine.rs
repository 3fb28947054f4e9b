//! 候诊状态机
//!
//! 管理候诊条目从入队到离开队列的状态转换

use clinic_core::{ClinicError, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 候诊状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueEvent {
    Attend,   // 医生接诊
    Withdraw, // 管理性撤出
}

/// 候诊状态机
#[derive(Debug)]
pub struct QueueStateMachine {
    transitions: HashMap<(QueueStatus, QueueEvent), QueueStatus>,
}

impl QueueStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        transitions.insert((QueueStatus::Waiting, QueueEvent::Attend), QueueStatus::Completed);
        transitions.insert((QueueStatus::Waiting, QueueEvent::Withdraw), QueueStatus::Withdrawn);

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: QueueStatus, event: QueueEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: QueueStatus, event: QueueEvent) -> Result<QueueStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(ClinicError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取状态的所有可能事件
    pub fn get_possible_events(&self, current_state: QueueStatus) -> Vec<QueueEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current_state)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for QueueStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = QueueStateMachine::new();

        assert!(sm.can_transition(QueueStatus::Waiting, QueueEvent::Attend));
        assert!(sm.can_transition(QueueStatus::Waiting, QueueEvent::Withdraw));
        assert_eq!(sm.get_possible_events(QueueStatus::Waiting).len(), 2);
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = QueueStateMachine::new();

        assert!(!sm.can_transition(QueueStatus::Completed, QueueEvent::Attend));
        assert!(!sm.can_transition(QueueStatus::Withdrawn, QueueEvent::Attend));
        assert!(sm.get_possible_events(QueueStatus::Completed).is_empty());
    }

    #[test]
    fn test_state_execution() {
        let sm = QueueStateMachine::new();

        let result = sm.transition(QueueStatus::Waiting, QueueEvent::Attend);
        assert_eq!(result.unwrap(), QueueStatus::Completed);

        let result = sm.transition(QueueStatus::Completed, QueueEvent::Withdraw);
        assert!(matches!(result, Err(ClinicError::InvalidStateTransition { .. })));
    }
}
