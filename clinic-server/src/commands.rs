//! 子命令实现

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clinic_admin::{ClinicConfig, ConfigManager};
use clinic_core::utils::parse_vital_field;
use clinic_core::{PriorityLevel, VitalReading};
use clinic_workflow::{
    sequence, ClinicWorkflow, NewPatient, NewPrescription, Prioritized, TriageClassifier,
    TriageIntake,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 输入文件中的一条候诊记录，其余字段原样透传
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRow {
    pub id: String,
    pub priority: PriorityLevel,
    pub joined_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Prioritized for QueueRow {
    fn priority(&self) -> PriorityLevel {
        self.priority
    }

    fn arrived_at(&self) -> DateTime<Utc> {
        self.joined_at
    }
}

/// 解析候诊列表，未知优先级会被拒绝
pub fn parse_queue(source: &str) -> Result<Vec<QueueRow>> {
    serde_json::from_str(source).context("Invalid queue file")
}

/// 将命令行上的原始体征字段转换为读数，缺失、空白或无法解析的字段视为未测量
pub fn vitals_from_fields(fields: [Option<&str>; 4]) -> VitalReading {
    let [systolic_bp, heart_rate, temperature, spo2] =
        fields.map(|field| field.and_then(parse_vital_field));
    VitalReading {
        systolic_bp,
        heart_rate,
        temperature,
        spo2,
    }
}

/// `classify` 子命令
pub fn classify(config: &ClinicConfig, fields: [Option<&str>; 4], json: bool) -> Result<()> {
    let classifier = TriageClassifier::new(config.triage.thresholds)?;

    let vitals = vitals_from_fields(fields);
    let assessment = classifier.assess(&vitals);

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!("{}", assessment.priority);
    for triggered in &assessment.triggered {
        println!("  {} = {} {}", triggered.kind, triggered.value, triggered.kind.unit());
    }
    if vitals.is_empty() {
        println!("  (no vitals provided)");
    }
    Ok(())
}

/// `sequence` 子命令
pub async fn sequence_file(path: &str) -> Result<()> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;

    let rows = parse_queue(&source)?;
    tracing::info!("Sequencing {} queue entries from {}", rows.len(), path);

    let ordered = sequence(&rows);
    println!("{}", serde_json::to_string_pretty(&ordered)?);
    Ok(())
}

/// `check-config` 子命令
pub async fn check_config(manager: &ConfigManager, write: Option<&str>) -> Result<()> {
    println!("{}", manager.to_toml()?);
    if let Some(path) = write {
        manager.save_config(path).await?;
    }
    Ok(())
}

/// `demo` 子命令：一次完整的前台分诊流程
pub fn demo(config: &ClinicConfig) -> Result<()> {
    let mut workflow =
        ClinicWorkflow::with_settings(config.triage.thresholds, config.queue.max_waiting)?;
    let nurse = Uuid::new_v4();
    let doctor = Uuid::new_v4();

    // (姓名, 原始体征, 护士覆盖)
    let arrivals = [
        (("Grace", "Mwangi"), [124.0, 78.0, 36.9, 98.0], None),
        (("Peter", "Odhiambo"), [96.0, 104.0, 37.8, 96.0], None),
        (("Halima", "Yusuf"), [0.0, 0.0, 39.4, 0.0], None),
        (("John", "Kamau"), [118.0, 88.0, 37.2, 97.0], Some(PriorityLevel::Urgent)),
    ];

    for ((first_name, last_name), [sys, hr, temp, spo2], priority_override) in arrivals {
        let patient = workflow.register_patient(NewPatient {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Default::default()
        })?;

        let outcome = workflow.record_triage(TriageIntake {
            patient_id: patient.id,
            nurse_id: nurse,
            vitals: VitalReading::from_raw(sys, hr, temp, spo2),
            diastolic_bp: None,
            symptoms: None,
            priority_override,
        })?;

        println!(
            "triaged {:<18} suggested {:<9} final {}",
            patient.full_name(),
            outcome.record.suggested_priority,
            outcome.record.priority
        );
    }

    println!("\nLive queue:");
    let now = Utc::now();
    for (position, waiting) in workflow
        .live_queue(now)
        .iter()
        .take(config.queue.page_limit)
        .enumerate()
    {
        println!(
            "  {}. {:<18} {:<9} waiting {} min",
            position + 1,
            waiting.patient_name,
            waiting.entry.priority,
            waiting.wait_minutes
        );
    }

    if let Some(consultation) = workflow.attend_next(doctor)? {
        workflow.add_prescription(NewPrescription {
            consultation_id: consultation.id,
            medication_name: "Paracetamol".to_string(),
            dosage: "1g".to_string(),
            frequency: Some("every 6 hours".to_string()),
            duration: Some("3 days".to_string()),
        })?;
        workflow.finish_consultation(consultation.id, "Febrile illness", "Fluids and rest")?;

        let history = workflow.patient_history(consultation.patient_id)?;
        println!(
            "\nAttended {}: {} consultation(s), {} triage record(s)",
            history.patient.full_name(),
            history.consultations.len(),
            history.triage_records.len()
        );
    }

    let overview = workflow.overview(Utc::now());
    println!(
        "\nOverview: {} patients, {} waiting, {} attended, longest wait {} min",
        overview.registered_patients,
        overview.queue.waiting,
        overview.queue.completed,
        overview.queue.longest_wait_minutes
    );
    Ok(())
}
