//! 患者登记
//!
//! 前台登记、修改和检索患者基本信息

use clinic_core::{ClinicError, Gender, Patient, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 登记表单
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub medical_history: Option<String>,
}

impl NewPatient {
    fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() {
            return Err(ClinicError::Validation("first name is required".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(ClinicError::Validation("last name is required".to_string()));
        }
        Ok(())
    }
}

/// 患者登记簿
#[derive(Debug, Default)]
pub struct PatientRegistry {
    patients: HashMap<Uuid, Patient>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记新患者
    pub fn register(&mut self, form: NewPatient) -> Result<Patient> {
        form.validate()?;

        let now = chrono::Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            date_of_birth: form.date_of_birth,
            gender: form.gender,
            phone: form.phone,
            medical_history: form.medical_history,
            created_at: now,
            updated_at: now,
        };

        self.patients.insert(patient.id, patient.clone());
        tracing::info!("Registered patient {}", patient.id);
        Ok(patient)
    }

    /// 修改患者信息
    pub fn update(&mut self, patient_id: Uuid, form: NewPatient) -> Result<Patient> {
        form.validate()?;

        let patient = self
            .patients
            .get_mut(&patient_id)
            .ok_or_else(|| ClinicError::NotFound(format!("Patient {} not found", patient_id)))?;

        patient.first_name = form.first_name.trim().to_string();
        patient.last_name = form.last_name.trim().to_string();
        patient.date_of_birth = form.date_of_birth;
        patient.gender = form.gender;
        patient.phone = form.phone;
        patient.medical_history = form.medical_history;
        patient.updated_at = chrono::Utc::now();

        tracing::info!("Updated patient {}", patient_id);
        Ok(patient.clone())
    }

    pub fn get(&self, patient_id: Uuid) -> Option<&Patient> {
        self.patients.get(&patient_id)
    }

    pub fn contains(&self, patient_id: Uuid) -> bool {
        self.patients.contains_key(&patient_id)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// 按姓名或电话检索（不区分大小写）
    pub fn search(&self, term: &str) -> Vec<&Patient> {
        let needle = term.trim().to_lowercase();
        let mut found: Vec<&Patient> = self
            .patients
            .values()
            .filter(|p| {
                needle.is_empty()
                    || p.full_name().to_lowercase().contains(&needle)
                    || p.phone.as_deref().map_or(false, |phone| phone.contains(&needle))
            })
            .collect();
        sort_by_name(&mut found);
        found
    }

    /// 全部患者，按姓、名排序
    pub fn list(&self) -> Vec<&Patient> {
        let mut all: Vec<&Patient> = self.patients.values().collect();
        sort_by_name(&mut all);
        all
    }
}

fn sort_by_name(patients: &mut [&Patient]) {
    patients.sort_by(|a, b| {
        a.last_name
            .to_lowercase()
            .cmp(&b.last_name.to_lowercase())
            .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(first: &str, last: &str) -> NewPatient {
        NewPatient {
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: Some("0712345678".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = PatientRegistry::new();
        let patient = registry.register(form(" Amina ", "Otieno")).unwrap();

        assert_eq!(patient.first_name, "Amina");
        assert!(registry.contains(patient.id));
        assert_eq!(registry.get(patient.id).unwrap().full_name(), "Amina Otieno");
    }

    #[test]
    fn test_register_requires_names() {
        let mut registry = PatientRegistry::new();
        assert!(matches!(
            registry.register(form("", "Otieno")),
            Err(ClinicError::Validation(_))
        ));
        assert!(registry.register(form("Amina", "   ")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_unknown_patient() {
        let mut registry = PatientRegistry::new();
        let result = registry.update(Uuid::new_v4(), form("A", "B"));
        assert!(matches!(result, Err(ClinicError::NotFound(_))));
    }

    #[test]
    fn test_update_patient() {
        let mut registry = PatientRegistry::new();
        let patient = registry.register(form("Amina", "Otieno")).unwrap();
        let updated = registry.update(patient.id, form("Amina", "Wanjiru")).unwrap();
        assert_eq!(updated.last_name, "Wanjiru");
        assert!(updated.updated_at >= patient.updated_at);
    }

    #[test]
    fn test_search_and_list_order() {
        let mut registry = PatientRegistry::new();
        registry.register(form("Zed", "Banda")).unwrap();
        registry.register(form("Amina", "Otieno")).unwrap();
        registry.register(form("Ali", "Banda")).unwrap();

        let names: Vec<String> = registry.list().iter().map(|p| p.full_name()).collect();
        assert_eq!(names, vec!["Ali Banda", "Zed Banda", "Amina Otieno"]);

        assert_eq!(registry.search("banda").len(), 2);
        assert_eq!(registry.search("0712").len(), 3);
        assert!(registry.search("nobody").is_empty());
    }
}
