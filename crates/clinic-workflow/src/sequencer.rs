//! 候诊排序
//!
//! 先按临床严重程度，再按到达时间先后；同一优先级同一时间的条目保持输入顺序。

use chrono::{DateTime, Utc};
use clinic_core::{PriorityLevel, QueueEntry};

/// 可参与候诊排序的条目
pub trait Prioritized {
    fn priority(&self) -> PriorityLevel;
    fn arrived_at(&self) -> DateTime<Utc>;
}

impl Prioritized for QueueEntry {
    fn priority(&self) -> PriorityLevel {
        self.priority
    }

    fn arrived_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}

impl<T: Prioritized + ?Sized> Prioritized for &T {
    fn priority(&self) -> PriorityLevel {
        (**self).priority()
    }

    fn arrived_at(&self) -> DateTime<Utc> {
        (**self).arrived_at()
    }
}

/// 返回排好序的新序列，不修改输入
pub fn sequence<T: Prioritized + Clone>(entries: &[T]) -> Vec<T> {
    let mut ordered = entries.to_vec();
    sequence_in_place(&mut ordered);
    ordered
}

/// 原地排序
pub fn sequence_in_place<T: Prioritized>(entries: &mut [T]) {
    // slice::sort_by_key 是稳定排序
    entries.sort_by_key(|entry| (entry.priority().rank(), entry.arrived_at()));
}
