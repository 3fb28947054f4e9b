//! 核心数据模型定义

use crate::error::ClinicError;
use crate::utils::sanitize_vital;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 分诊优先级
///
/// 按临床严重程度全序：`Emergency > Urgent > Normal`。
/// 只接受这三个取值，反序列化和 [`FromStr`] 都会拒绝其他字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityLevel {
    Normal,    // 正常 (绿)
    Urgent,    // 紧急 (橙)
    Emergency, // 危急 (红)
}

impl PriorityLevel {
    /// 排队序号，越小越先就诊
    pub fn rank(self) -> u8 {
        match self {
            PriorityLevel::Emergency => 0,
            PriorityLevel::Urgent => 1,
            PriorityLevel::Normal => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityLevel::Emergency => "Emergency",
            PriorityLevel::Urgent => "Urgent",
            PriorityLevel::Normal => "Normal",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityLevel {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(PriorityLevel::Emergency),
            "urgent" => Ok(PriorityLevel::Urgent),
            "normal" => Ok(PriorityLevel::Normal),
            other => Err(ClinicError::Validation(format!(
                "unknown priority level: {:?}",
                other
            ))),
        }
    }
}

/// 生命体征类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalKind {
    SystolicBp,  // 收缩压
    HeartRate,   // 心率
    Temperature, // 体温
    Spo2,        // 血氧饱和度
}

impl VitalKind {
    pub const ALL: [VitalKind; 4] = [
        VitalKind::SystolicBp,
        VitalKind::HeartRate,
        VitalKind::Temperature,
        VitalKind::Spo2,
    ];

    pub fn unit(self) -> &'static str {
        match self {
            VitalKind::SystolicBp => "mmHg",
            VitalKind::HeartRate => "bpm",
            VitalKind::Temperature => "°C",
            VitalKind::Spo2 => "%",
        }
    }
}

impl fmt::Display for VitalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VitalKind::SystolicBp => "systolic BP",
            VitalKind::HeartRate => "heart rate",
            VitalKind::Temperature => "temperature",
            VitalKind::Spo2 => "SpO2",
        };
        f.write_str(name)
    }
}

/// 一次分诊采集的生命体征
///
/// `None` 表示未测量。原始表单中的 0、负数和非有限值在 [`VitalReading::from_raw`]
/// 中统一视为未测量。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub systolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub spo2: Option<f64>,
}

impl VitalReading {
    /// 从原始表单数值构造，0 表示未填写
    pub fn from_raw(systolic_bp: f64, heart_rate: f64, temperature: f64, spo2: f64) -> Self {
        Self {
            systolic_bp: sanitize_vital(systolic_bp),
            heart_rate: sanitize_vital(heart_rate),
            temperature: sanitize_vital(temperature),
            spo2: sanitize_vital(spo2),
        }
    }

    /// 获取某项已测量的体征值
    ///
    /// 即使字段里存的是 `Some(0.0)`（例如经反序列化得到），也按未测量处理。
    pub fn get(&self, kind: VitalKind) -> Option<f64> {
        let raw = match kind {
            VitalKind::SystolicBp => self.systolic_bp,
            VitalKind::HeartRate => self.heart_rate,
            VitalKind::Temperature => self.temperature,
            VitalKind::Spo2 => self.spo2,
        };
        raw.and_then(sanitize_vital)
    }

    /// 已测量的体征
    pub fn provided(&self) -> impl Iterator<Item = (VitalKind, f64)> + '_ {
        VitalKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|value| (kind, value)))
    }

    /// 是否没有任何已测量的体征
    pub fn is_empty(&self) -> bool {
        self.provided().next().is_none()
    }
}

/// 性别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub medical_history: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 分诊记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    pub vitals: VitalReading,
    pub diastolic_bp: Option<f64>, // 舒张压，仅记录，不参与分级
    pub symptoms: Option<String>,
    pub suggested_priority: PriorityLevel, // 分级器给出的建议
    pub priority: PriorityLevel,           // 最终优先级（护士可覆盖）
    pub created_at: DateTime<Utc>,
}

impl TriageRecord {
    /// 护士是否覆盖了建议优先级
    pub fn is_overridden(&self) -> bool {
        self.priority != self.suggested_priority
    }
}

/// 候诊状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueStatus {
    Waiting,   // 候诊中
    Completed, // 已接诊
    Withdrawn, // 已撤出
}

/// 候诊队列条目
///
/// 优先级在入队时确定，之后不再原地修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub triage_id: Uuid,
    pub priority: PriorityLevel,
    pub joined_at: DateTime<Utc>,
    pub status: QueueStatus,
}

impl QueueEntry {
    /// 等候分钟数
    pub fn wait_minutes(&self, now: DateTime<Utc>) -> i64 {
        crate::utils::minutes_between(self.joined_at, now)
    }
}

/// 门诊记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub queue_entry_id: Option<Uuid>,
    pub diagnosis: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Consultation {
    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }
}

/// 处方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_severity_order() {
        assert!(PriorityLevel::Emergency > PriorityLevel::Urgent);
        assert!(PriorityLevel::Urgent > PriorityLevel::Normal);
        assert!(PriorityLevel::Emergency.rank() < PriorityLevel::Normal.rank());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("Emergency".parse::<PriorityLevel>().unwrap(), PriorityLevel::Emergency);
        assert_eq!(" urgent ".parse::<PriorityLevel>().unwrap(), PriorityLevel::Urgent);
        assert!("Critical".parse::<PriorityLevel>().is_err());
        assert!("".parse::<PriorityLevel>().is_err());
    }

    #[test]
    fn test_priority_serde_rejects_unknown() {
        let level: PriorityLevel = serde_json::from_str("\"Normal\"").unwrap();
        assert_eq!(level, PriorityLevel::Normal);
        assert!(serde_json::from_str::<PriorityLevel>("\"Low\"").is_err());
        assert_eq!(serde_json::to_string(&PriorityLevel::Urgent).unwrap(), "\"Urgent\"");
    }

    #[test]
    fn test_vitals_from_raw() {
        let vitals = VitalReading::from_raw(0.0, 72.0, f64::NAN, -3.0);
        assert_eq!(vitals.systolic_bp, None);
        assert_eq!(vitals.heart_rate, Some(72.0));
        assert_eq!(vitals.temperature, None);
        assert_eq!(vitals.spo2, None);
        assert!(!vitals.is_empty());
        assert!(VitalReading::from_raw(0.0, 0.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_vitals_zero_is_absent_after_deserialize() {
        let vitals: VitalReading = serde_json::from_str(
            r#"{"systolic_bp":0.0,"heart_rate":null,"temperature":37.0,"spo2":null}"#,
        )
        .unwrap();
        assert_eq!(vitals.get(VitalKind::SystolicBp), None);
        assert_eq!(
            vitals.provided().collect::<Vec<_>>(),
            vec![(VitalKind::Temperature, 37.0)]
        );
    }
}
