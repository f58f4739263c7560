//! Tool catalog — the four sub-agent declarations the model may call, and the
//! system instruction that tells it how to pick one.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::inference::types::{FunctionDefinition, ToolDefinition};

/// Default system instruction for the front-desk agent.
pub const SYSTEM_INSTRUCTION: &str = "\
You are the Hospital System Coordinator, the central agent that receives every \
request from patients, staff, and administrators and routes it to the right \
hospital function.

Rules:
1. Delegation: always choose the ONE function (sub-agent) most relevant to the request.
2. Context: extract every parameter the function needs from the user's request.
3. Clarification: if the request is ambiguous, do not call a function; ask the user to clarify.
4. Safety: you are handling a domain that demands high accuracy (medical) and compliance \
(finance, medical records). Never invent record numbers or results; report what the tools return.";

// ─── Tool names ─────────────────────────────────────────────────────────────

/// The fixed set of sub-agent tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    PatientDataManagement,
    MedicalScheduling,
    GeneralMedicalInformation,
    HospitalAdministration,
}

impl ToolName {
    pub const ALL: [ToolName; 4] = [
        ToolName::PatientDataManagement,
        ToolName::MedicalScheduling,
        ToolName::GeneralMedicalInformation,
        ToolName::HospitalAdministration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::PatientDataManagement => "patient_data_management",
            ToolName::MedicalScheduling => "medical_scheduling",
            ToolName::GeneralMedicalInformation => "general_medical_information",
            ToolName::HospitalAdministration => "hospital_administration_operations",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool: '{s}'"))
    }
}

// ─── Catalog ────────────────────────────────────────────────────────────────

fn function(name: ToolName, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        r#type: "function".to_string(),
        function: FunctionDefinition {
            name: name.as_str().to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Declarations for every tool, in catalog order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        function(
            ToolName::PatientDataManagement,
            "Handles patient data: new patient registration, identity/social data updates, \
             inpatient/outpatient care status lookups, and medical record retrieval. Requires a \
             unique identifier such as the national ID number (NIK) or the medical record number (RM).",
            json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "description": "Requested action: NewRegistration, UpdateData, CheckCareStatus, FetchMedicalRecord."
                    },
                    "identityNumber": {
                        "type": "string",
                        "description": "Unique patient identifier: national ID (NIK) or record number (RM-xxxx)."
                    },
                    "patientDetails": {
                        "type": "string",
                        "description": "Details to enter or change, e.g. \"name: Ahmad, status: Inpatient\" or \"New address: Jl. Mawar No. 5\"."
                    }
                },
                "required": ["action", "identityNumber"]
            }),
        ),
        function(
            ToolName::MedicalScheduling,
            "Manages scheduling: creating, changing, or cancelling appointments, checking doctor \
             availability, and checking bed or facility availability.",
            json!({
                "type": "object",
                "properties": {
                    "serviceType": {
                        "type": "string",
                        "description": "Service focus: BookAppointment, CheckDoctorSchedule, CheckFacilityAvailability."
                    },
                    "serviceFocus": {
                        "type": "string",
                        "description": "Doctor, specialty clinic, or facility, e.g. \"Dr. Agung Sp.A\", \"Cardiology Clinic\", \"VIP Room\"."
                    },
                    "dateTime": {
                        "type": "string",
                        "description": "Specific date and time, e.g. \"tomorrow at 10am\", \"2024-11-20\"."
                    },
                    "patientIdentity": {
                        "type": "string",
                        "description": "Patient NIK or record number when the booking is for a specific patient."
                    }
                },
                "required": ["serviceFocus", "dateTime"]
            }),
        ),
        function(
            ToolName::GeneralMedicalInformation,
            "Provides general medical information, health guidance, or clinical SOPs/protocols not \
             tied to a specific patient's data. Backed by the hospital knowledge base.",
            json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "Topic or medical term, e.g. \"TB symptoms\", \"Anaphylactic shock SOP\"."
                    },
                    "sourcePriority": {
                        "type": "string",
                        "description": "Preferred source, e.g. \"Clinical Guideline\", \"Patient Education\", \"General\"."
                    }
                },
                "required": ["topic"]
            }),
        ),
        function(
            ToolName::HospitalAdministration,
            "Handles back-office and administrative work: billing, insurance claims, financial \
             reporting (balance sheet, profit and loss), and asset/inventory management.",
            json!({
                "type": "object",
                "properties": {
                    "administrationType": {
                        "type": "string",
                        "description": "Task category: CheckBilling, InsuranceClaim, FinancialReport, AssetManagement, InventoryCheck."
                    },
                    "referenceDetail": {
                        "type": "string",
                        "description": "Invoice number, insurer, asset/drug name, or report type, e.g. \"Invoice No. 123\", \"BPJS Kesehatan\", \"MRI asset\"."
                    },
                    "reportPeriod": {
                        "type": "string",
                        "description": "Relevant period, e.g. \"Q3 2024\", \"last month\"."
                    }
                },
                "required": ["administrationType"]
            }),
        ),
    ]
}

// ─── Tests ──────────────────────────────────────────────────────────────────
