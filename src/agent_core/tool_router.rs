//! ToolRouter — dispatches model tool calls to the record store.
//!
//! The ToolRouter is the bridge between the model's tool call decisions and
//! the hospital backend. It handles:
//! - Routing by tool name to one of the four sub-agents
//! - Argument extraction (missing values become empty strings)
//! - Simulated backend latency before every store write
//! - Mapping every outcome, including unknown tools, into a [`ToolResult`]
//!
//! Dispatch never fails. Errors are reported in the result's status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::inference::types::ToolCall;

use super::record_store::{
    CareStatus, FinancialKind, NewAppointment, NewPatient, PatientUpdate, RecordStore,
};
use super::tools::ToolName;
use super::types::ToolResult;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Backend latency simulated before each store write.
pub const DEFAULT_TOOL_LATENCY: Duration = Duration::from_millis(800);

/// Name used when registration details carry no recognizable name.
const DEFAULT_PATIENT_NAME: &str = "New Patient";

/// Appointment holder when no patient identity was given.
const UNASSIGNED_PATIENT: &str = "General/TBD";

/// Markers that introduce a name in free-text details.
const NAME_MARKERS: [&str; 2] = ["name", "nama"];

// ─── Sub-agent actions ──────────────────────────────────────────────────────

/// `action` values for `patient_data_management`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatientAction {
    NewRegistration,
    UpdateData,
    CheckCareStatus,
    Other(String),
}

impl PatientAction {
    fn parse(s: &str) -> Self {
        match s {
            "NewRegistration" => PatientAction::NewRegistration,
            "UpdateData" => PatientAction::UpdateData,
            "CheckCareStatus" => PatientAction::CheckCareStatus,
            other => PatientAction::Other(other.to_string()),
        }
    }
}

/// `administrationType` values for `hospital_administration_operations`
/// that read from the store. Everything else is acknowledged.
fn overview_kind(administration_type: &str) -> Option<FinancialKind> {
    match administration_type {
        "CheckBilling" => Some(FinancialKind::Invoice),
        "AssetManagement" => Some(FinancialKind::Asset),
        _ => None,
    }
}

// ─── ToolRouter ─────────────────────────────────────────────────────────────

/// Dispatches tool calls from the model to the shared [`RecordStore`].
pub struct ToolRouter {
    store: Arc<RecordStore>,
    latency: Duration,
}

impl ToolRouter {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self::with_latency(store, DEFAULT_TOOL_LATENCY)
    }

    pub fn with_latency(store: Arc<RecordStore>, latency: Duration) -> Self {
        Self { store, latency }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    // ─── Dispatch ───────────────────────────────────────────────────────

    /// Execute one tool call and return its result.
    pub async fn dispatch(&self, tool_call: &ToolCall) -> ToolResult {
        let start = Instant::now();
        let args = &tool_call.arguments;

        let result = match tool_call.name.parse::<ToolName>() {
            Ok(ToolName::PatientDataManagement) => self.patient_data_management(args).await,
            Ok(ToolName::MedicalScheduling) => self.medical_scheduling(args).await,
            Ok(ToolName::GeneralMedicalInformation) => general_medical_information(args),
            Ok(ToolName::HospitalAdministration) => self.hospital_administration(args),
            Err(_) => {
                tracing::warn!(
                    tool = %tool_call.name,
                    call_id = %tool_call.id,
                    "model requested unknown tool"
                );
                ToolResult::error("Tool not recognized.")
            }
        };

        tracing::info!(
            tool = %tool_call.name,
            call_id = %tool_call.id,
            status = ?result.status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tool executed"
        );
        result
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    // ─── patient_data_management ────────────────────────────────────────

    async fn patient_data_management(&self, args: &Value) -> ToolResult {
        let action = str_arg(args, "action");
        let identity = str_arg(args, "identityNumber");
        let details = opt_str_arg(args, "patientDetails");

        match PatientAction::parse(&action) {
            PatientAction::NewRegistration => {
                let name = details
                    .as_deref()
                    .and_then(extract_patient_name)
                    .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string());

                self.simulate_latency().await;
                let patient = self.store.add_patient(NewPatient {
                    name,
                    national_id: identity,
                    status: CareStatus::Registered,
                });
                ToolResult::success(format!(
                    "Registration successful. Patient: {}, Record No.: {}. The data has been saved.",
                    patient.name, patient.record_number
                ))
            }
            PatientAction::CheckCareStatus => match self.store.find_patient(&identity) {
                Some(patient) => ToolResult::with_data(json!(patient)),
                None => ToolResult::not_found("Patient not found in the database."),
            },
            PatientAction::UpdateData => {
                let details = details.unwrap_or_default();
                let update = parse_patient_update(&details);

                self.simulate_latency().await;
                let matched = self.store.update_patient(&identity, &update);
                tracing::debug!(identity = %identity, matched, empty_update = update.is_empty(), "patient update");
                ToolResult::success(format!(
                    "Patient data for {identity} updated as requested: {details}"
                ))
            }
            PatientAction::Other(action) => ToolResult::success(format!("Action {action} completed.")),
        }
    }

    // ─── medical_scheduling ─────────────────────────────────────────────

    async fn medical_scheduling(&self, args: &Value) -> ToolResult {
        let provider = str_arg(args, "serviceFocus");
        let time = str_arg(args, "dateTime");

        let patient_name = match opt_str_arg(args, "patientIdentity") {
            Some(identity) => match self.store.find_patient(&identity) {
                Some(patient) => patient.name,
                None => format!("Patient ({identity})"),
            },
            None => UNASSIGNED_PATIENT.to_string(),
        };

        self.simulate_latency().await;
        let appointment = self.store.add_appointment(NewAppointment {
            patient_name,
            provider: provider.clone(),
            time: time.clone(),
        });

        ToolResult::success(format!(
            "Booking confirmed: {provider} at {time}. Code: BK-{}",
            appointment.id.to_uppercase()
        ))
        .and_data(json!(appointment))
    }

    // ─── hospital_administration_operations ─────────────────────────────

    fn hospital_administration(&self, args: &Value) -> ToolResult {
        let administration_type = str_arg(args, "administrationType");

        if let Some(kind) = overview_kind(&administration_type) {
            let overview = self.store.snapshot().financials_of(kind);
            return ToolResult::with_data(json!({ "overview": overview }));
        }

        let reference = str_arg(args, "referenceDetail");
        let message = match opt_str_arg(args, "reportPeriod") {
            Some(period) => format!(
                "Administration request {administration_type} ({reference}, {period}) is being processed."
            ),
            None => format!("Administration request {administration_type} ({reference}) is being processed."),
        };
        ToolResult::success(message)
    }
}

// ─── general_medical_information ────────────────────────────────────────────

fn general_medical_information(args: &Value) -> ToolResult {
    let topic = str_arg(args, "topic");
    ToolResult::with_content(format!(
        "[Knowledge Base] Hospital SOP on \"{topic}\": handling covers priority-1 triage, \
         ABC stabilization (Airway, Breathing, Circulation), and specialist referral when needed."
    ))
}

// ─── Argument helpers ───────────────────────────────────────────────────────

/// String argument, or `""` when absent. Non-string scalars are rendered.
fn str_arg(args: &Value, key: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// String argument, `None` when absent or blank.
fn opt_str_arg(args: &Value, key: &str) -> Option<String> {
    let value = str_arg(args, key);
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// ─── Detail parsing ─────────────────────────────────────────────────────────

/// Pull a patient name out of free-text registration details.
///
/// Looks for a `name` marker (optionally followed by `:` or `is`) and takes
/// the letters and spaces after it up to `,`, `.`, or the end. Without a
/// marker and without any `:`, the first comma-delimited segment is the name.
pub fn extract_patient_name(details: &str) -> Option<String> {
    if let Some(name) = find_marked_name(details) {
        return Some(name);
    }
    if details.contains(':') {
        return None;
    }
    let first = details.split(',').next().unwrap_or_default().trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

fn find_marked_name(details: &str) -> Option<String> {
    let lower = details.to_ascii_lowercase();

    for marker in NAME_MARKERS {
        let mut search_from = 0;
        while let Some(pos) = lower[search_from..].find(marker) {
            let start = search_from + pos;
            search_from = start + marker.len();

            let at_word_start = lower[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_ascii_alphabetic());
            if !at_word_start {
                continue;
            }
            if let Some(name) = name_after_marker(&details[start + marker.len()..]) {
                return Some(name);
            }
        }
    }
    None
}

/// `after` is the text right after a name marker.
fn name_after_marker(after: &str) -> Option<String> {
    // Marker glued to the following word ("names").
    if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut rest = after.trim_start();
    if let Some(stripped) = rest.strip_prefix(':') {
        rest = stripped;
    } else if rest
        .get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("is"))
        && rest[2..].starts_with(char::is_whitespace)
    {
        rest = &rest[2..];
    }
    let rest = rest.trim_start();

    let end = rest
        .find(|c: char| !(c.is_ascii_alphabetic() || c.is_whitespace()))
        .unwrap_or(rest.len());
    let terminated = match rest[end..].chars().next() {
        None | Some(',') | Some('.') => true,
        Some(_) => false,
    };
    let name = rest[..end].trim();
    if terminated && !name.is_empty() {
        Some(name.to_string())
    } else {
        None
    }
}

/// Parse `key: value` pairs (comma or semicolon separated) from update
/// details. Recognizes `name` and `status`; everything else is ignored.
pub fn parse_patient_update(details: &str) -> PatientUpdate {
    let mut update = PatientUpdate::default();

    for field in details.split([',', ';']) {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "name" | "nama" => update.name = Some(value.to_string()),
            "status" => match value.parse::<CareStatus>() {
                Ok(status) => update.status = Some(status),
                Err(e) => tracing::debug!(error = %e, "ignoring status in update details"),
            },
            _ => {}
        }
    }
    update
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::ToolStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn router() -> ToolRouter {
        ToolRouter::with_latency(Arc::new(RecordStore::with_demo_data()), Duration::ZERO)
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "call_test".to_string(),
            name: name.to_string(),
            arguments: args,
        }
    }

    #[test]
    fn test_extract_name_with_marker() {
        assert_eq!(extract_patient_name("name: Ahmad").as_deref(), Some("Ahmad"));
        assert_eq!(
            extract_patient_name("Name is Siti Rahma, born 1990-01-01").as_deref(),
            Some("Siti Rahma")
        );
        assert_eq!(
            extract_patient_name("alamat: Jl. Mawar, nama: Dewi Lestari.").as_deref(),
            Some("Dewi Lestari")
        );
        assert_eq!(extract_patient_name("nama Ismail").as_deref(), Some("Ismail"));
    }

    #[test]
    fn test_extract_name_first_segment_without_colon() {
        assert_eq!(
            extract_patient_name("Budi Hartono, 45 years old").as_deref(),
            Some("Budi Hartono")
        );
    }

    #[test]
    fn test_extract_name_fallbacks() {
        // Digits break the name run; a colon disables the segment fallback.
        assert_eq!(extract_patient_name("name: Ahmad 2"), None);
        assert_eq!(extract_patient_name("birth date: 1990-01-01"), None);
        assert_eq!(extract_patient_name(""), None);
        assert_eq!(extract_patient_name("surname: X1"), None);
    }

    #[test]
    fn test_parse_patient_update() {
        let update = parse_patient_update("name: Budi S., status: Rawat Inap");
        assert_eq!(update.name.as_deref(), Some("Budi S."));
        assert_eq!(update.status, Some(CareStatus::Inpatient));

        assert!(parse_patient_update("New address: Jl. Mawar No. 5").is_empty());
        assert!(parse_patient_update("status: discharged").is_empty());
    }

    #[tokio::test]
    async fn test_new_registration_uses_extracted_name() {
        let router = router();
        let result = router
            .dispatch(&call(
                "patient_data_management",
                json!({
                    "action": "NewRegistration",
                    "identityNumber": "3301999988887777",
                    "patientDetails": "name: Ahmad"
                }),
            ))
            .await;

        assert!(result.is_success());
        let created = router.store().find_patient("3301999988887777").unwrap();
        assert_eq!(created.name, "Ahmad");
        assert_eq!(created.status, CareStatus::Registered);
        let message = result.message.unwrap();
        assert!(message.contains("Ahmad"));
        assert!(message.contains(&created.record_number));
    }

    #[tokio::test]
    async fn test_new_registration_default_name() {
        let router = router();
        router
            .dispatch(&call(
                "patient_data_management",
                json!({"action": "NewRegistration", "identityNumber": "42"}),
            ))
            .await;
        assert_eq!(router.store().find_patient("42").unwrap().name, "New Patient");
    }

    #[tokio::test]
    async fn test_check_care_status_hit_and_miss() {
        let router = router();
        let hit = router
            .dispatch(&call(
                "patient_data_management",
                json!({"action": "CheckCareStatus", "identityNumber": "RM-1024"}),
            ))
            .await;
        assert_eq!(hit.status, ToolStatus::Success);
        assert_eq!(hit.data.unwrap()["name"], "Budi Santoso");

        let miss = router
            .dispatch(&call(
                "patient_data_management",
                json!({"action": "CheckCareStatus", "identityNumber": "RM-0000"}),
            ))
            .await;
        assert_eq!(miss.status, ToolStatus::NotFound);
    }

    #[tokio::test]
    async fn test_update_data_applies_fields_and_notifies() {
        let router = router();
        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        let _sub = router.store().subscribe(move || {
            n.fetch_add(1, Ordering::SeqCst);
        });

        let result = router
            .dispatch(&call(
                "patient_data_management",
                json!({
                    "action": "UpdateData",
                    "identityNumber": "3301123456780003",
                    "patientDetails": "status: Outpatient"
                }),
            ))
            .await;
        assert!(result.message.unwrap().ends_with("status: Outpatient"));
        assert_eq!(
            router.store().find_patient("RM-1026").unwrap().status,
            CareStatus::Outpatient
        );

        // Unparseable details still take the notification path.
        router
            .dispatch(&call(
                "patient_data_management",
                json!({
                    "action": "UpdateData",
                    "identityNumber": "RM-1026",
                    "patientDetails": "new address: Jl. Mawar"
                }),
            ))
            .await;
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_patient_action_acknowledged() {
        let result = router()
            .dispatch(&call(
                "patient_data_management",
                json!({"action": "FetchMedicalRecord", "identityNumber": "RM-1024"}),
            ))
            .await;
        assert_eq!(result.message.as_deref(), Some("Action FetchMedicalRecord completed."));
    }

    #[tokio::test]
    async fn test_scheduling_resolves_patient_name() {
        let router = router();
        let result = router
            .dispatch(&call(
                "medical_scheduling",
                json!({
                    "serviceFocus": "Poli Jantung",
                    "dateTime": "2024-11-21 09:00",
                    "patientIdentity": "RM-1025"
                }),
            ))
            .await;

        let data = result.data.clone().unwrap();
        assert_eq!(data["patientName"], "Siti Aminah");
        assert_eq!(data["status"], "Scheduled");
        let id = data["id"].as_str().unwrap().to_uppercase();
        assert!(result.message.unwrap().ends_with(&format!("BK-{id}")));
    }

    #[tokio::test]
    async fn test_scheduling_placeholder_names() {
        let router = router();
        router
            .dispatch(&call(
                "medical_scheduling",
                json!({"serviceFocus": "VIP Room", "dateTime": "tomorrow", "patientIdentity": "777"}),
            ))
            .await;
        router
            .dispatch(&call(
                "medical_scheduling",
                json!({"serviceFocus": "Dr. Agung Sp.A", "dateTime": "Friday"}),
            ))
            .await;

        let appts = router.store().snapshot().appointments;
        assert_eq!(appts[0].patient_name, "General/TBD");
        assert_eq!(appts[1].patient_name, "Patient (777)");
    }

    #[tokio::test]
    async fn test_general_information_interpolates_topic() {
        let result = router()
            .dispatch(&call("general_medical_information", json!({"topic": "Anaphylaxis"})))
            .await;
        assert!(result.content.unwrap().contains("\"Anaphylaxis\""));
    }

    #[tokio::test]
    async fn test_administration_overviews() {
        let router = router();
        let billing = router
            .dispatch(&call(
                "hospital_administration_operations",
                json!({"administrationType": "CheckBilling"}),
            ))
            .await;
        let overview = billing.data.unwrap()["overview"].clone();
        assert_eq!(overview.as_array().unwrap().len(), 1);
        assert_eq!(overview[0]["type"], "Invoice");

        let assets = router
            .dispatch(&call(
                "hospital_administration_operations",
                json!({"administrationType": "AssetManagement"}),
            ))
            .await;
        assert_eq!(assets.data.unwrap()["overview"][0]["description"], "MRI Scanner GE");

        let claim = router
            .dispatch(&call(
                "hospital_administration_operations",
                json!({"administrationType": "InsuranceClaim", "referenceDetail": "BPJS Kesehatan"}),
            ))
            .await;
        assert_eq!(
            claim.message.as_deref(),
            Some("Administration request InsuranceClaim (BPJS Kesehatan) is being processed.")
        );
    }

    #[tokio::test]
    async fn test_missing_arguments_render_empty() {
        let result = router()
            .dispatch(&call("hospital_administration_operations", json!({})))
            .await;
        assert_eq!(
            result.message.as_deref(),
            Some("Administration request  () is being processed.")
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let router = router();
        let before = router.store().snapshot();
        let result = router.dispatch(&call("delete_everything", json!({}))).await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.message.as_deref(), Some("Tool not recognized."));
        assert_eq!(router.store().snapshot(), before);
    }

    #[tokio::test]
    async fn test_latency_applied_before_write() {
        let latency = Duration::from_millis(30);
        let router = ToolRouter::with_latency(Arc::new(RecordStore::new()), latency);
        let start = Instant::now();
        router
            .dispatch(&call(
                "medical_scheduling",
                json!({"serviceFocus": "ER", "dateTime": "now"}),
            ))
            .await;
        assert!(start.elapsed() >= latency);
    }
}
