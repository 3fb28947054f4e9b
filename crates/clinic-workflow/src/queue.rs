//! 候诊队列管理
//!
//! 维护实时候诊队列，对外给出按优先级排好序的候诊列表

use crate::sequencer;
use crate::state_machine::{QueueEvent, QueueStateMachine};
use chrono::{DateTime, Utc};
use clinic_core::{ClinicError, PriorityLevel, QueueEntry, QueueStatus, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 候诊列表默认每页条数
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// 候诊队列过滤器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<Vec<QueueStatus>>,
    pub priority: Option<Vec<PriorityLevel>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Default for QueueFilter {
    fn default() -> Self {
        Self {
            patient_id: None,
            status: None,
            priority: None,
            limit: Some(DEFAULT_PAGE_LIMIT),
            offset: Some(0),
        }
    }
}

impl QueueFilter {
    /// 只看候诊中的条目
    pub fn waiting() -> Self {
        Self {
            status: Some(vec![QueueStatus::Waiting]),
            ..Default::default()
        }
    }
}

/// 候诊队列统计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_entries: usize,
    pub waiting: usize,
    pub completed: usize,
    pub withdrawn: usize,
    pub waiting_by_priority: HashMap<PriorityLevel, usize>,
    pub longest_wait_minutes: i64,
    pub average_wait_minutes: f64,
}

/// 候诊队列管理器
#[derive(Debug)]
pub struct QueueManager {
    entries: HashMap<Uuid, QueueEntry>,
    arrival_order: Vec<Uuid>,
    patient_entries: HashMap<Uuid, Vec<Uuid>>, // patient_id -> queue entry ids
    state_machine: QueueStateMachine,
    max_waiting: Option<usize>,
}

impl QueueManager {
    /// 创建新的候诊队列
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            arrival_order: Vec::new(),
            patient_entries: HashMap::new(),
            state_machine: QueueStateMachine::new(),
            max_waiting: None,
        }
    }

    /// 限制同时候诊人数
    pub fn with_max_waiting(max_waiting: usize) -> Self {
        Self {
            max_waiting: Some(max_waiting),
            ..Self::new()
        }
    }

    /// 入队
    pub fn enqueue(
        &mut self,
        patient_id: Uuid,
        triage_id: Uuid,
        priority: PriorityLevel,
        joined_at: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        if self.is_waiting(patient_id) {
            return Err(ClinicError::Conflict(format!(
                "Patient {} is already waiting in the queue",
                patient_id
            )));
        }

        if let Some(max_waiting) = self.max_waiting {
            if self.waiting_count() >= max_waiting {
                tracing::warn!("Queue is full ({} waiting), rejecting patient {}", max_waiting, patient_id);
                return Err(ClinicError::Conflict(format!(
                    "Queue is full ({} patients waiting)",
                    max_waiting
                )));
            }
        }

        let entry = QueueEntry {
            id: Uuid::new_v4(),
            patient_id,
            triage_id,
            priority,
            joined_at,
            status: QueueStatus::Waiting,
        };

        self.entries.insert(entry.id, entry.clone());
        self.arrival_order.push(entry.id);
        self.patient_entries
            .entry(patient_id)
            .or_insert_with(Vec::new)
            .push(entry.id);

        tracing::info!("Patient {} joined the queue as {} ({})", patient_id, priority, entry.id);
        Ok(entry)
    }

    /// 获取候诊条目
    pub fn get(&self, entry_id: Uuid) -> Option<&QueueEntry> {
        self.entries.get(&entry_id)
    }

    /// 查询候诊队列，结果按就诊顺序排列后分页
    pub fn query(&self, filter: &QueueFilter) -> Vec<QueueEntry> {
        let mut items: Vec<&QueueEntry> = self
            .arrival_order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect();

        if let Some(patient_id) = filter.patient_id {
            items.retain(|item| item.patient_id == patient_id);
        }

        if let Some(statuses) = &filter.status {
            items.retain(|item| statuses.contains(&item.status));
        }

        if let Some(priorities) = &filter.priority {
            items.retain(|item| priorities.contains(&item.priority));
        }

        sequencer::sequence_in_place(&mut items);

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        items
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// 全部候诊中的患者，第一个即为下一位就诊者
    pub fn waiting(&self) -> Vec<QueueEntry> {
        let filter = QueueFilter {
            limit: Some(usize::MAX),
            ..QueueFilter::waiting()
        };
        self.query(&filter)
    }

    /// 下一位就诊者
    pub fn next(&self) -> Option<QueueEntry> {
        self.waiting().into_iter().next()
    }

    pub fn waiting_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.status == QueueStatus::Waiting)
            .count()
    }

    /// 患者是否正在候诊
    pub fn is_waiting(&self, patient_id: Uuid) -> bool {
        self.patient_entries
            .get(&patient_id)
            .map(|ids| {
                ids.iter().any(|id| {
                    self.entries
                        .get(id)
                        .map_or(false, |entry| entry.status == QueueStatus::Waiting)
                })
            })
            .unwrap_or(false)
    }

    /// 医生接诊，条目离开候诊队列
    pub fn mark_attended(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        self.apply_event(entry_id, QueueEvent::Attend)
    }

    /// 管理性撤出
    pub fn withdraw(&mut self, entry_id: Uuid) -> Result<QueueEntry> {
        self.apply_event(entry_id, QueueEvent::Withdraw)
    }

    fn apply_event(&mut self, entry_id: Uuid, event: QueueEvent) -> Result<QueueEntry> {
        let entry = self
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Queue entry {} not found", entry_id)))?;

        let old_status = entry.status;
        entry.status = self.state_machine.transition(old_status, event)?;

        tracing::info!(
            "Updated queue entry {} status from {:?} to {:?}",
            entry_id,
            old_status,
            entry.status
        );
        Ok(entry.clone())
    }

    /// 患者的全部排队记录，最早的在前
    pub fn entries_for_patient(&self, patient_id: Uuid) -> Vec<&QueueEntry> {
        self.patient_entries
            .get(&patient_id)
            .map(|ids| ids.iter().filter_map(|id| self.entries.get(id)).collect())
            .unwrap_or_default()
    }

    /// 获取队列统计
    pub fn stats(&self, now: DateTime<Utc>) -> QueueStats {
        let mut stats = QueueStats {
            total_entries: self.entries.len(),
            waiting: 0,
            completed: 0,
            withdrawn: 0,
            waiting_by_priority: HashMap::new(),
            longest_wait_minutes: 0,
            average_wait_minutes: 0.0,
        };

        let mut total_wait: i64 = 0;

        for entry in self.entries.values() {
            match entry.status {
                QueueStatus::Waiting => {
                    stats.waiting += 1;
                    *stats.waiting_by_priority.entry(entry.priority).or_insert(0) += 1;

                    let wait = entry.wait_minutes(now);
                    total_wait += wait;
                    stats.longest_wait_minutes = stats.longest_wait_minutes.max(wait);
                }
                QueueStatus::Completed => stats.completed += 1,
                QueueStatus::Withdrawn => stats.withdrawn += 1,
            }
        }

        if stats.waiting > 0 {
            stats.average_wait_minutes = total_wait as f64 / stats.waiting as f64;
        }

        stats
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}
