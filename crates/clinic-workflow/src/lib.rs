//! # 门诊工作流模块
//!
//! 提供分诊与候诊的完整工作流，包括：
//! - 分诊分级器：根据生命体征给出 Emergency / Urgent / Normal
//! - 候诊排序：严重程度优先，同级先到先诊
//! - 候诊状态机：管理队列条目从候诊到接诊或撤出
//! - 患者登记、候诊队列、接诊与处方管理

pub mod classifier;
pub mod consultation;
pub mod engine;
pub mod queue;
pub mod registry;
pub mod sequencer;
pub mod state_machine;

// 重新导出主要类型
pub use classifier::{
    classify, Band, BandSet, TriageAssessment, TriageClassifier, TriageThresholds,
    TriggeredVital, DEFAULT_THRESHOLDS,
};
pub use consultation::{ConsultationManager, ConsultationSummary, NewPrescription};
pub use engine::{
    ClinicOverview, ClinicWorkflow, PatientHistory, TriageIntake, TriageOutcome, WaitingPatient,
};
pub use queue::{QueueFilter, QueueManager, QueueStats, DEFAULT_PAGE_LIMIT};
pub use registry::{NewPatient, PatientRegistry};
pub use sequencer::{sequence, sequence_in_place, Prioritized};
pub use state_machine::{QueueEvent, QueueStateMachine};
