//! 分诊优先级分级器
//!
//! 根据生命体征给出临床紧急程度。阈值以数据表形式给出，
//! 按严重程度从高到低逐级匹配，第一个命中的级别即为结果。

use clinic_core::{ClinicError, PriorityLevel, Result, VitalKind, VitalReading};
use serde::{Deserialize, Serialize};

/// 单项体征的异常区间，两端均为闭区间
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// 小于等于该值即触发
    #[serde(default)]
    pub at_or_below: Option<f64>,
    /// 大于等于该值即触发
    #[serde(default)]
    pub at_or_above: Option<f64>,
}

impl Band {
    pub const fn new(at_or_below: Option<f64>, at_or_above: Option<f64>) -> Self {
        Self {
            at_or_below,
            at_or_above,
        }
    }

    /// 数值是否落入异常区间
    pub fn contains(&self, value: f64) -> bool {
        self.at_or_below.map_or(false, |low| value <= low)
            || self.at_or_above.map_or(false, |high| value >= high)
    }

    /// `inner` 触发的每个值是否也会触发 `self`
    fn covers(&self, inner: &Band) -> bool {
        let low_ok = match (inner.at_or_below, self.at_or_below) {
            (None, _) => true,
            (Some(inner_low), Some(low)) => inner_low <= low,
            (Some(_), None) => false,
        };
        let high_ok = match (inner.at_or_above, self.at_or_above) {
            (None, _) => true,
            (Some(inner_high), Some(high)) => inner_high >= high,
            (Some(_), None) => false,
        };
        low_ok && high_ok
    }

    fn is_finite(&self) -> bool {
        self.at_or_below.map_or(true, f64::is_finite) && self.at_or_above.map_or(true, f64::is_finite)
    }
}

/// 某一级别下四项体征的异常区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    pub systolic_bp: Band,
    pub heart_rate: Band,
    pub temperature: Band,
    pub spo2: Band,
}

impl BandSet {
    pub fn band(&self, kind: VitalKind) -> &Band {
        match kind {
            VitalKind::SystolicBp => &self.systolic_bp,
            VitalKind::HeartRate => &self.heart_rate,
            VitalKind::Temperature => &self.temperature,
            VitalKind::Spo2 => &self.spo2,
        }
    }

    /// 命中的体征，未测量的体征永远不会命中
    pub fn triggered_by(&self, vitals: &VitalReading) -> Vec<TriggeredVital> {
        vitals
            .provided()
            .filter(|(kind, value)| self.band(*kind).contains(*value))
            .map(|(kind, value)| TriggeredVital { kind, value })
            .collect()
    }
}

/// 分级阈值表
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriageThresholds {
    pub emergency: BandSet,
    pub urgent: BandSet,
}

/// 默认临床阈值
pub const DEFAULT_THRESHOLDS: TriageThresholds = TriageThresholds {
    emergency: BandSet {
        systolic_bp: Band::new(Some(90.0), Some(220.0)),
        heart_rate: Band::new(Some(40.0), Some(130.0)),
        temperature: Band::new(Some(35.0), Some(39.1)),
        spo2: Band::new(Some(91.0), None),
    },
    urgent: BandSet {
        systolic_bp: Band::new(Some(100.0), Some(200.0)),
        heart_rate: Band::new(Some(50.0), Some(110.0)),
        temperature: Band::new(Some(36.0), Some(38.1)),
        spo2: Band::new(Some(95.0), None),
    },
};

impl Default for TriageThresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS
    }
}

impl TriageThresholds {
    /// 按严重程度从高到低排列的级别表
    pub fn tiers(&self) -> [(PriorityLevel, &BandSet); 2] {
        [
            (PriorityLevel::Emergency, &self.emergency),
            (PriorityLevel::Urgent, &self.urgent),
        ]
    }

    /// 校验阈值表
    ///
    /// 每项体征的危急区间必须被紧急区间包含，逐级短路匹配才等价于取最严重的命中级别。
    pub fn validate(&self) -> Result<()> {
        for kind in VitalKind::ALL {
            let emergency = self.emergency.band(kind);
            let urgent = self.urgent.band(kind);

            if !emergency.is_finite() || !urgent.is_finite() {
                return Err(ClinicError::Validation(format!(
                    "{} thresholds must be finite",
                    kind
                )));
            }

            if !urgent.covers(emergency) {
                return Err(ClinicError::Validation(format!(
                    "{} emergency band {:?} is not contained in urgent band {:?}",
                    kind, emergency, urgent
                )));
            }
        }
        Ok(())
    }
}

/// 触发分级的体征
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggeredVital {
    pub kind: VitalKind,
    pub value: f64,
}

/// 分级结果及其依据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAssessment {
    pub priority: PriorityLevel,
    pub triggered: Vec<TriggeredVital>,
}

/// 分诊分级器
#[derive(Debug, Clone, Default)]
pub struct TriageClassifier {
    thresholds: TriageThresholds,
}

impl TriageClassifier {
    /// 使用给定阈值表创建分级器
    pub fn new(thresholds: TriageThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &TriageThresholds {
        &self.thresholds
    }

    /// 计算优先级
    pub fn classify(&self, vitals: &VitalReading) -> PriorityLevel {
        self.assess(vitals).priority
    }

    /// 计算优先级并给出触发的体征
    pub fn assess(&self, vitals: &VitalReading) -> TriageAssessment {
        assess_with(&self.thresholds, vitals)
    }
}

/// 使用默认阈值计算优先级
pub fn classify(vitals: &VitalReading) -> PriorityLevel {
    assess_with(&DEFAULT_THRESHOLDS, vitals).priority
}

fn assess_with(thresholds: &TriageThresholds, vitals: &VitalReading) -> TriageAssessment {
    if vitals.is_empty() {
        return TriageAssessment {
            priority: PriorityLevel::Normal,
            triggered: Vec::new(),
        };
    }

    for (priority, bands) in thresholds.tiers() {
        let triggered = bands.triggered_by(vitals);
        if !triggered.is_empty() {
            tracing::debug!("Vitals classified as {} by {:?}", priority, triggered);
            return TriageAssessment {
                priority,
                triggered,
            };
        }
    }

    TriageAssessment {
        priority: PriorityLevel::Normal,
        triggered: Vec::new(),
    }
}
