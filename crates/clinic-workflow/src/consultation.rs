//! 门诊接诊与处方

use clinic_core::{ClinicError, Consultation, Prescription, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 新处方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub consultation_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Option<String>,
    pub duration: Option<String>,
}

/// 门诊记录及其处方
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSummary {
    pub consultation: Consultation,
    pub prescriptions: Vec<Prescription>,
}

/// 门诊管理器
#[derive(Debug, Default)]
pub struct ConsultationManager {
    consultations: HashMap<Uuid, Consultation>,
    prescriptions: HashMap<Uuid, Vec<Prescription>>, // consultation_id -> prescriptions
}

impl ConsultationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始接诊，诊断和备注由医生稍后填写
    pub fn start(&mut self, doctor_id: Uuid, patient_id: Uuid, queue_entry_id: Option<Uuid>) -> Consultation {
        let consultation = Consultation {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            queue_entry_id,
            diagnosis: String::new(),
            notes: String::new(),
            created_at: chrono::Utc::now(),
            finished_at: None,
        };

        self.consultations.insert(consultation.id, consultation.clone());
        tracing::info!(
            "Doctor {} started consultation {} for patient {}",
            doctor_id,
            consultation.id,
            patient_id
        );
        consultation
    }

    pub fn get(&self, consultation_id: Uuid) -> Option<&Consultation> {
        self.consultations.get(&consultation_id)
    }

    /// 填写诊断并结束接诊
    pub fn finish(&mut self, consultation_id: Uuid, diagnosis: &str, notes: &str) -> Result<Consultation> {
        if diagnosis.trim().is_empty() {
            return Err(ClinicError::Validation("diagnosis is required".to_string()));
        }

        let consultation = self.consultations.get_mut(&consultation_id).ok_or_else(|| {
            ClinicError::NotFound(format!("Consultation {} not found", consultation_id))
        })?;

        consultation.diagnosis = diagnosis.trim().to_string();
        consultation.notes = notes.trim().to_string();
        consultation.finished_at = Some(chrono::Utc::now());

        tracing::info!("Consultation {} finished", consultation_id);
        Ok(consultation.clone())
    }

    /// 开具处方
    pub fn add_prescription(&mut self, form: NewPrescription) -> Result<Prescription> {
        if !self.consultations.contains_key(&form.consultation_id) {
            return Err(ClinicError::NotFound(format!(
                "Consultation {} not found",
                form.consultation_id
            )));
        }
        if form.medication_name.trim().is_empty() {
            return Err(ClinicError::Validation("medication name is required".to_string()));
        }
        if form.dosage.trim().is_empty() {
            return Err(ClinicError::Validation("dosage is required".to_string()));
        }

        let prescription = Prescription {
            id: Uuid::new_v4(),
            consultation_id: form.consultation_id,
            medication_name: form.medication_name.trim().to_string(),
            dosage: form.dosage.trim().to_string(),
            frequency: form.frequency,
            duration: form.duration,
            created_at: chrono::Utc::now(),
        };

        self.prescriptions
            .entry(form.consultation_id)
            .or_insert_with(Vec::new)
            .push(prescription.clone());

        tracing::info!(
            "Added prescription {} ({}) to consultation {}",
            prescription.id,
            prescription.medication_name,
            form.consultation_id
        );
        Ok(prescription)
    }

    pub fn prescriptions(&self, consultation_id: Uuid) -> &[Prescription] {
        self.prescriptions
            .get(&consultation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 患者的门诊记录，最新的在前
    pub fn for_patient(&self, patient_id: Uuid) -> Vec<ConsultationSummary> {
        self.summaries(|c| c.patient_id == patient_id)
    }

    /// 医生的门诊记录，最新的在前
    pub fn for_doctor(&self, doctor_id: Uuid) -> Vec<ConsultationSummary> {
        self.summaries(|c| c.doctor_id == doctor_id)
    }

    /// 尚未结束的接诊数
    pub fn open_count(&self) -> usize {
        self.consultations.values().filter(|c| c.is_open()).count()
    }

    fn summaries<F>(&self, predicate: F) -> Vec<ConsultationSummary>
    where
        F: Fn(&Consultation) -> bool,
    {
        let mut matching: Vec<&Consultation> = self
            .consultations
            .values()
            .filter(|c| predicate(c))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        matching
            .into_iter()
            .map(|c| ConsultationSummary {
                consultation: c.clone(),
                prescriptions: self.prescriptions(c.id).to_vec(),
            })
            .collect()
    }
}
