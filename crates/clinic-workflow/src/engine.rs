//! 门诊工作流引擎
//!
//! 协调患者登记、分诊、候诊队列和接诊的核心引擎

use crate::{
    classifier::{TriageAssessment, TriageClassifier, TriageThresholds},
    consultation::{ConsultationManager, ConsultationSummary, NewPrescription},
    queue::{QueueManager, QueueStats},
    registry::{NewPatient, PatientRegistry},
    sequencer::Prioritized,
};
use chrono::{DateTime, Utc};
use clinic_core::{
    ClinicError, Consultation, Patient, Prescription, PriorityLevel, QueueEntry, Result,
    TriageRecord, VitalReading,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 分诊录入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageIntake {
    pub patient_id: Uuid,
    pub nurse_id: Uuid,
    pub vitals: VitalReading,
    pub diastolic_bp: Option<f64>,
    pub symptoms: Option<String>,
    /// 护士手动选择的优先级，为空时采用分级器建议
    pub priority_override: Option<PriorityLevel>,
}

/// 分诊结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub record: TriageRecord,
    pub queue_entry: QueueEntry,
}

/// 候诊列表中的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingPatient {
    pub entry: QueueEntry,
    pub patient_name: String,
    pub wait_minutes: i64,
}

impl Prioritized for WaitingPatient {
    fn priority(&self) -> PriorityLevel {
        self.entry.priority
    }

    fn arrived_at(&self) -> DateTime<Utc> {
        self.entry.joined_at
    }
}

/// 患者就诊历史
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub consultations: Vec<ConsultationSummary>,
    pub triage_records: Vec<TriageRecord>,
}

/// 门诊概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicOverview {
    pub registered_patients: usize,
    pub triage_records: usize,
    pub open_consultations: usize,
    pub queue: QueueStats,
}

/// 门诊工作流引擎
///
/// 协调所有工作流组件，提供统一的门诊管理接口
#[derive(Debug)]
pub struct ClinicWorkflow {
    registry: PatientRegistry,
    classifier: TriageClassifier,
    queue: QueueManager,
    consultations: ConsultationManager,
    triage_records: HashMap<Uuid, TriageRecord>,
}

impl ClinicWorkflow {
    /// 使用默认阈值创建工作流引擎
    pub fn new() -> Self {
        Self {
            registry: PatientRegistry::new(),
            classifier: TriageClassifier::default(),
            queue: QueueManager::new(),
            consultations: ConsultationManager::new(),
            triage_records: HashMap::new(),
        }
    }

    /// 使用配置的阈值和候诊上限创建
    pub fn with_settings(thresholds: TriageThresholds, max_waiting: Option<usize>) -> Result<Self> {
        let queue = match max_waiting {
            Some(max) => QueueManager::with_max_waiting(max),
            None => QueueManager::new(),
        };

        Ok(Self {
            classifier: TriageClassifier::new(thresholds)?,
            queue,
            ..Self::new()
        })
    }

    pub fn register_patient(&mut self, form: NewPatient) -> Result<Patient> {
        self.registry.register(form)
    }

    pub fn update_patient(&mut self, patient_id: Uuid, form: NewPatient) -> Result<Patient> {
        self.registry.update(patient_id, form)
    }

    pub fn registry(&self) -> &PatientRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// 录入体征前预览建议优先级
    pub fn assess(&self, vitals: &VitalReading) -> TriageAssessment {
        self.classifier.assess(vitals)
    }

    /// 保存分诊记录并将患者加入候诊队列
    pub fn record_triage(&mut self, intake: TriageIntake) -> Result<TriageOutcome> {
        if !self.registry.contains(intake.patient_id) {
            return Err(ClinicError::NotFound(format!(
                "Patient {} not found",
                intake.patient_id
            )));
        }

        let assessment = self.classifier.assess(&intake.vitals);
        let priority = intake.priority_override.unwrap_or(assessment.priority);

        if priority != assessment.priority {
            tracing::warn!(
                "Nurse {} overrode suggested priority {} with {} for patient {}",
                intake.nurse_id,
                assessment.priority,
                priority,
                intake.patient_id
            );
        }

        let record = TriageRecord {
            id: Uuid::new_v4(),
            patient_id: intake.patient_id,
            nurse_id: intake.nurse_id,
            vitals: intake.vitals,
            diastolic_bp: intake.diastolic_bp,
            symptoms: intake.symptoms.filter(|s| !s.trim().is_empty()),
            suggested_priority: assessment.priority,
            priority,
            created_at: Utc::now(),
        };

        // 先入队，入队失败时不留下孤立的分诊记录
        let queue_entry = self
            .queue
            .enqueue(record.patient_id, record.id, priority, record.created_at)?;
        self.triage_records.insert(record.id, record.clone());

        tracing::info!(
            "Triage {} recorded for patient {} with priority {}",
            record.id,
            record.patient_id,
            priority
        );

        Ok(TriageOutcome {
            record,
            queue_entry,
        })
    }

    pub fn triage_record(&self, triage_id: Uuid) -> Option<&TriageRecord> {
        self.triage_records.get(&triage_id)
    }

    /// 实时候诊列表，第一行即为下一位就诊者
    pub fn live_queue(&self, now: DateTime<Utc>) -> Vec<WaitingPatient> {
        self.queue
            .waiting()
            .into_iter()
            .map(|entry| WaitingPatient {
                patient_name: self
                    .registry
                    .get(entry.patient_id)
                    .map(Patient::full_name)
                    .unwrap_or_else(|| "Unknown patient".to_string()),
                wait_minutes: entry.wait_minutes(now),
                entry,
            })
            .collect()
    }

    /// 医生接诊指定候诊条目
    pub fn attend(&mut self, queue_entry_id: Uuid, doctor_id: Uuid) -> Result<Consultation> {
        let entry = self.queue.mark_attended(queue_entry_id)?;
        Ok(self
            .consultations
            .start(doctor_id, entry.patient_id, Some(entry.id)))
    }

    /// 医生接诊下一位，队列为空时返回 `None`
    pub fn attend_next(&mut self, doctor_id: Uuid) -> Result<Option<Consultation>> {
        match self.queue.next() {
            Some(entry) => self.attend(entry.id, doctor_id).map(Some),
            None => {
                tracing::debug!("Doctor {} found the queue empty", doctor_id);
                Ok(None)
            }
        }
    }

    /// 管理性撤出候诊
    pub fn withdraw(&mut self, queue_entry_id: Uuid) -> Result<QueueEntry> {
        self.queue.withdraw(queue_entry_id)
    }

    pub fn finish_consultation(
        &mut self,
        consultation_id: Uuid,
        diagnosis: &str,
        notes: &str,
    ) -> Result<Consultation> {
        self.consultations.finish(consultation_id, diagnosis, notes)
    }

    pub fn add_prescription(&mut self, form: NewPrescription) -> Result<Prescription> {
        self.consultations.add_prescription(form)
    }

    /// 医生的接诊记录
    pub fn doctor_consultations(&self, doctor_id: Uuid) -> Vec<ConsultationSummary> {
        self.consultations.for_doctor(doctor_id)
    }

    /// 患者就诊历史，最新的在前
    pub fn patient_history(&self, patient_id: Uuid) -> Result<PatientHistory> {
        let patient = self
            .registry
            .get(patient_id)
            .cloned()
            .ok_or_else(|| ClinicError::NotFound(format!("Patient {} not found", patient_id)))?;

        let mut triage_records: Vec<TriageRecord> = self
            .triage_records
            .values()
            .filter(|record| record.patient_id == patient_id)
            .cloned()
            .collect();
        triage_records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(PatientHistory {
            patient,
            consultations: self.consultations.for_patient(patient_id),
            triage_records,
        })
    }

    /// 获取系统概览
    pub fn overview(&self, now: DateTime<Utc>) -> ClinicOverview {
        ClinicOverview {
            registered_patients: self.registry.len(),
            triage_records: self.triage_records.len(),
            open_consultations: self.consultations.open_count(),
            queue: self.queue.stats(now),
        }
    }
}

impl Default for ClinicWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::sequence;
    use clinic_core::QueueStatus;

    fn register(workflow: &mut ClinicWorkflow, first: &str, last: &str) -> Patient {
        workflow
            .register_patient(NewPatient {
                first_name: first.to_string(),
                last_name: last.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    fn intake(patient_id: Uuid, vitals: VitalReading) -> TriageIntake {
        TriageIntake {
            patient_id,
            nurse_id: Uuid::new_v4(),
            vitals,
            diastolic_bp: Some(80.0),
            symptoms: Some("fever".to_string()),
            priority_override: None,
        }
    }

    #[test]
    fn test_record_triage_enqueues_with_classified_priority() {
        let mut workflow = ClinicWorkflow::new();
        let patient = register(&mut workflow, "Amina", "Otieno");

        let outcome = workflow
            .record_triage(intake(patient.id, VitalReading::from_raw(120.0, 72.0, 39.5, 97.0)))
            .unwrap();

        assert_eq!(outcome.record.suggested_priority, PriorityLevel::Emergency);
        assert_eq!(outcome.record.priority, PriorityLevel::Emergency);
        assert!(!outcome.record.is_overridden());
        assert_eq!(outcome.queue_entry.triage_id, outcome.record.id);
        assert_eq!(outcome.queue_entry.status, QueueStatus::Waiting);
        assert!(workflow.triage_record(outcome.record.id).is_some());
    }

    #[test]
    fn test_nurse_override_is_recorded() {
        let mut workflow = ClinicWorkflow::new();
        let patient = register(&mut workflow, "Amina", "Otieno");

        let mut form = intake(patient.id, VitalReading::from_raw(120.0, 72.0, 36.8, 98.0));
        form.priority_override = Some(PriorityLevel::Urgent);
        let outcome = workflow.record_triage(form).unwrap();

        assert_eq!(outcome.record.suggested_priority, PriorityLevel::Normal);
        assert_eq!(outcome.record.priority, PriorityLevel::Urgent);
        assert!(outcome.record.is_overridden());
        assert_eq!(outcome.queue_entry.priority, PriorityLevel::Urgent);
    }

    #[test]
    fn test_triage_unknown_patient() {
        let mut workflow = ClinicWorkflow::new();
        let result = workflow.record_triage(intake(Uuid::new_v4(), VitalReading::default()));
        assert!(matches!(result, Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_triage_leaves_no_orphan_record() {
        let mut workflow = ClinicWorkflow::new();
        let patient = register(&mut workflow, "Amina", "Otieno");

        workflow
            .record_triage(intake(patient.id, VitalReading::default()))
            .unwrap();
        let again = workflow.record_triage(intake(patient.id, VitalReading::default()));

        assert!(matches!(again, Err(ClinicError::Conflict(_))));
        assert_eq!(workflow.overview(Utc::now()).triage_records, 1);
    }

    #[test]
    fn test_live_queue_order_and_attend() {
        let mut workflow = ClinicWorkflow::new();
        let normal = register(&mut workflow, "Nora", "Normal");
        let urgent = register(&mut workflow, "Uma", "Urgent");
        let emergency = register(&mut workflow, "Eli", "Emergency");

        workflow
            .record_triage(intake(normal.id, VitalReading::from_raw(120.0, 72.0, 36.8, 98.0)))
            .unwrap();
        workflow
            .record_triage(intake(urgent.id, VitalReading::from_raw(95.0, 0.0, 0.0, 0.0)))
            .unwrap();
        workflow
            .record_triage(intake(emergency.id, VitalReading::from_raw(0.0, 0.0, 0.0, 88.0)))
            .unwrap();

        let live = workflow.live_queue(Utc::now());
        let names: Vec<&str> = live.iter().map(|w| w.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Eli Emergency", "Uma Urgent", "Nora Normal"]);

        // 候诊视图本身也能重新排序，结果不变
        let resequenced: Vec<Uuid> = sequence(&live).iter().map(|w| w.entry.id).collect();
        let original: Vec<Uuid> = live.iter().map(|w| w.entry.id).collect();
        assert_eq!(resequenced, original);

        let doctor = Uuid::new_v4();
        let consultation = workflow.attend_next(doctor).unwrap().unwrap();
        assert_eq!(consultation.patient_id, emergency.id);
        assert_eq!(consultation.queue_entry_id, Some(live[0].entry.id));
        assert_eq!(workflow.live_queue(Utc::now()).len(), 2);
        assert_eq!(workflow.live_queue(Utc::now())[0].patient_name, "Uma Urgent");
    }

    #[test]
    fn test_attend_next_on_empty_queue() {
        let mut workflow = ClinicWorkflow::new();
        assert!(workflow.attend_next(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_withdraw_then_attend_fails() {
        let mut workflow = ClinicWorkflow::new();
        let patient = register(&mut workflow, "Amina", "Otieno");
        let outcome = workflow
            .record_triage(intake(patient.id, VitalReading::default()))
            .unwrap();

        workflow.withdraw(outcome.queue_entry.id).unwrap();
        assert!(matches!(
            workflow.attend(outcome.queue_entry.id, Uuid::new_v4()),
            Err(ClinicError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_consultation_and_history() {
        let mut workflow = ClinicWorkflow::new();
        let patient = register(&mut workflow, "Amina", "Otieno");
        let outcome = workflow
            .record_triage(intake(patient.id, VitalReading::from_raw(0.0, 115.0, 0.0, 0.0)))
            .unwrap();

        let doctor = Uuid::new_v4();
        let consultation = workflow.attend(outcome.queue_entry.id, doctor).unwrap();
        workflow
            .add_prescription(NewPrescription {
                consultation_id: consultation.id,
                medication_name: "Metoprolol".to_string(),
                dosage: "25mg".to_string(),
                frequency: Some("daily".to_string()),
                duration: None,
            })
            .unwrap();
        workflow
            .finish_consultation(consultation.id, "Sinus tachycardia", "")
            .unwrap();

        let history = workflow.patient_history(patient.id).unwrap();
        assert_eq!(history.triage_records.len(), 1);
        assert_eq!(history.triage_records[0].priority, PriorityLevel::Urgent);
        assert_eq!(history.consultations.len(), 1);
        assert_eq!(history.consultations[0].prescriptions.len(), 1);
        assert_eq!(workflow.doctor_consultations(doctor).len(), 1);

        let overview = workflow.overview(Utc::now());
        assert_eq!(overview.registered_patients, 1);
        assert_eq!(overview.open_consultations, 0);
        assert_eq!(overview.queue.completed, 1);

        assert!(matches!(
            workflow.patient_history(Uuid::new_v4()),
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn test_with_settings_validates_thresholds() {
        let mut thresholds = TriageThresholds::default();
        thresholds.emergency.heart_rate.at_or_above = Some(100.0);
        assert!(ClinicWorkflow::with_settings(thresholds, None).is_err());

        let mut workflow = ClinicWorkflow::with_settings(TriageThresholds::default(), Some(1)).unwrap();
        let first = register(&mut workflow, "A", "One");
        let second = register(&mut workflow, "B", "Two");
        workflow
            .record_triage(intake(first.id, VitalReading::default()))
            .unwrap();
        assert!(matches!(
            workflow.record_triage(intake(second.id, VitalReading::default())),
            Err(ClinicError::Conflict(_))
        ));
    }
}
