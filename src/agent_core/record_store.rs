//! RecordStore — the in-memory hospital backend the tools operate on.
//!
//! Holds three collections (patients, appointments, financial records),
//! always ordered most-recent-first. Every mutating call notifies the
//! registered listeners exactly once, after the change is applied and after
//! the collection lock is released, so a listener may call [`RecordStore::snapshot`]
//! or drop its own subscription from inside the callback.
//!
//! Records are never deleted.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use uuid::Uuid;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Length of generated record ids.
const ID_LEN: usize = 9;

/// First record number handed out by an empty store.
const FIRST_RECORD_NUMBER: u32 = 1000;

/// Prefix of display record numbers (`RM-1024`).
const RECORD_NUMBER_PREFIX: &str = "RM-";

// ─── Patients ───────────────────────────────────────────────────────────────

/// Where a patient currently is in the care pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CareStatus {
    Registered,
    Outpatient,
    Inpatient,
    Emergency,
}

impl CareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareStatus::Registered => "Registered",
            CareStatus::Outpatient => "Outpatient",
            CareStatus::Inpatient => "Inpatient",
            CareStatus::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for CareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CareStatus {
    type Err = String;

    /// Accepts the English names and the ward labels staff actually type
    /// (`Rawat Inap`, `IGD`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "registered" | "terdaftar" => Ok(CareStatus::Registered),
            "outpatient" | "rawatjalan" => Ok(CareStatus::Outpatient),
            "inpatient" | "rawatinap" => Ok(CareStatus::Inpatient),
            "emergency" | "igd" | "er" => Ok(CareStatus::Emergency),
            _ => Err(format!("unknown care status: '{s}'")),
        }
    }
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub national_id: String,
    pub record_number: String,
    pub name: String,
    pub status: CareStatus,
}

/// Input for [`RecordStore::add_patient`]. The store assigns the id and the
/// record number.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub national_id: String,
    pub status: CareStatus,
}

/// Shallow partial update for [`RecordStore::update_patient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub national_id: Option<String>,
    pub status: Option<CareStatus>,
}

impl PatientUpdate {
    /// Whether applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.national_id.is_none() && self.status.is_none()
    }

    fn apply(&self, patient: &mut Patient) {
        if let Some(ref name) = self.name {
            patient.name = name.clone();
        }
        if let Some(ref national_id) = self.national_id {
            patient.national_id = national_id.clone();
        }
        if let Some(status) = self.status {
            patient.status = status;
        }
    }
}

impl Patient {
    /// Whether `identifier` is this patient's id, national id, or record number.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.id == identifier || self.national_id == identifier || self.record_number == identifier
    }
}

// ─── Appointments ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// A booked appointment. `patient_name` is a display copy, not a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    /// Doctor, specialty clinic, or facility.
    pub provider: String,
    /// Free text as the user said it ("besok pukul 10", "2024-11-20").
    pub time: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_name: String,
    pub provider: String,
    pub time: String,
}

// ─── Financial records ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FinancialKind {
    Invoice,
    Claim,
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvoiceStatus {
    #[serde(rename = "Belum Lunas")]
    Unpaid,
    #[serde(rename = "Lunas")]
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClaimStatus {
    Pending,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssetStatus {
    Pending,
    Verified,
    Active,
}

/// A financial record's status, tagged by the record type it belongs to.
///
/// Serializes flat as `"type": "Invoice", "status": "Belum Lunas"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "status")]
pub enum FinancialStatus {
    Invoice(InvoiceStatus),
    Claim(ClaimStatus),
    Asset(AssetStatus),
}

impl FinancialStatus {
    /// Status a newly entered record of `kind` starts in.
    pub fn initial(kind: FinancialKind) -> Self {
        match kind {
            FinancialKind::Invoice => FinancialStatus::Invoice(InvoiceStatus::Unpaid),
            FinancialKind::Claim => FinancialStatus::Claim(ClaimStatus::Pending),
            FinancialKind::Asset => FinancialStatus::Asset(AssetStatus::Pending),
        }
    }

    pub fn kind(&self) -> FinancialKind {
        match self {
            FinancialStatus::Invoice(_) => FinancialKind::Invoice,
            FinancialStatus::Claim(_) => FinancialKind::Claim,
            FinancialStatus::Asset(_) => FinancialKind::Asset,
        }
    }

    /// The status string shown to staff.
    pub fn label(&self) -> &'static str {
        match self {
            FinancialStatus::Invoice(InvoiceStatus::Unpaid) => "Belum Lunas",
            FinancialStatus::Invoice(InvoiceStatus::Paid) => "Lunas",
            FinancialStatus::Claim(ClaimStatus::Pending)
            | FinancialStatus::Asset(AssetStatus::Pending) => "Pending",
            FinancialStatus::Claim(ClaimStatus::Verified)
            | FinancialStatus::Asset(AssetStatus::Verified) => "Verified",
            FinancialStatus::Asset(AssetStatus::Active) => "Active",
        }
    }
}

impl fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialRecord {
    pub id: String,
    pub description: String,
    /// Display amount, e.g. `"Rp 4.500.000"`. Never parsed.
    pub amount: String,
    #[serde(flatten)]
    pub status: FinancialStatus,
}

impl FinancialRecord {
    pub fn kind(&self) -> FinancialKind {
        self.status.kind()
    }
}

#[derive(Debug, Clone)]
pub struct NewFinancialRecord {
    pub kind: FinancialKind,
    pub description: String,
    pub amount: String,
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// An independent copy of every collection in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSnapshot {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub financials: Vec<FinancialRecord>,
}

impl StoreSnapshot {
    /// Financial records of one type, in store order.
    pub fn financials_of(&self, kind: FinancialKind) -> Vec<FinancialRecord> {
        self.financials
            .iter()
            .filter(|f| f.kind() == kind)
            .cloned()
            .collect()
    }
}

// ─── Listener registry ──────────────────────────────────────────────────────

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Handle returned by [`RecordStore::subscribe`].
///
/// Dropping the handle does NOT unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<ListenerRegistry>>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if the store is gone or the
    /// listener was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        registry.listeners.len() != before
    }
}

// ─── RecordStore ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Collections {
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    financials: Vec<FinancialRecord>,
    next_record_number: u32,
}

/// Observable in-memory store shared (via `Arc`) by the tool router and any
/// dashboards.
pub struct RecordStore {
    collections: Mutex<Collections>,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::from_collections(Vec::new(), Vec::new(), Vec::new())
    }

    /// A store seeded with the front-desk demo records.
    pub fn with_demo_data() -> Self {
        let patients = vec![
            Patient {
                id: "p1".into(),
                name: "Budi Santoso".into(),
                national_id: "3301123456780001".into(),
                status: CareStatus::Inpatient,
                record_number: "RM-1024".into(),
            },
            Patient {
                id: "p2".into(),
                name: "Siti Aminah".into(),
                national_id: "3301123456780002".into(),
                status: CareStatus::Outpatient,
                record_number: "RM-1025".into(),
            },
            Patient {
                id: "p3".into(),
                name: "Ahmad Dahlan".into(),
                national_id: "3301123456780003".into(),
                status: CareStatus::Registered,
                record_number: "RM-1026".into(),
            },
        ];
        let appointments = vec![Appointment {
            id: "a1".into(),
            patient_name: "Siti Aminah".into(),
            provider: "Dr. Hartono Sp.OG".into(),
            time: "2024-11-20".into(),
            status: AppointmentStatus::Scheduled,
        }];
        let financials = vec![
            FinancialRecord {
                id: "f1".into(),
                description: "Tagihan Rawat Inap - Budi S".into(),
                amount: "Rp 4.500.000".into(),
                status: FinancialStatus::Invoice(InvoiceStatus::Unpaid),
            },
            FinancialRecord {
                id: "f2".into(),
                description: "MRI Scanner GE".into(),
                amount: "Rp 12.000.000.000".into(),
                status: FinancialStatus::Asset(AssetStatus::Active),
            },
            FinancialRecord {
                id: "f3".into(),
                description: "Klaim BPJS - Sep 2024".into(),
                amount: "Rp 150.000.000".into(),
                status: FinancialStatus::Claim(ClaimStatus::Pending),
            },
        ];
        Self::from_collections(patients, appointments, financials)
    }

    fn from_collections(
        patients: Vec<Patient>,
        appointments: Vec<Appointment>,
        financials: Vec<FinancialRecord>,
    ) -> Self {
        let next_record_number = patients
            .iter()
            .filter_map(|p| parse_record_number(&p.record_number))
            .max()
            .map(|n| n + 1)
            .unwrap_or(FIRST_RECORD_NUMBER);

        Self {
            collections: Mutex::new(Collections {
                patients,
                appointments,
                financials,
                next_record_number,
            }),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─── Subscription ───────────────────────────────────────────────────

    /// Register a callback invoked after every mutation.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// Invoke every listener once. Must be called with no store lock held.
    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    /// Copy all three collections.
    pub fn snapshot(&self) -> StoreSnapshot {
        let c = self.lock();
        StoreSnapshot {
            patients: c.patients.clone(),
            appointments: c.appointments.clone(),
            financials: c.financials.clone(),
        }
    }

    /// First patient whose national id or record number equals `identity`.
    pub fn find_patient(&self, identity: &str) -> Option<Patient> {
        self.lock()
            .patients
            .iter()
            .find(|p| p.national_id == identity || p.record_number == identity)
            .cloned()
    }

    // ─── Patients ───────────────────────────────────────────────────────

    /// Register a patient. Assigns a fresh id and the next record number.
    pub fn add_patient(&self, data: NewPatient) -> Patient {
        let patient = {
            let mut c = self.lock();
            let id = fresh_id(|candidate| c.patients.iter().any(|p| p.id == candidate));
            let record_number = format!("{RECORD_NUMBER_PREFIX}{}", c.next_record_number);
            c.next_record_number += 1;

            let patient = Patient {
                id,
                national_id: data.national_id,
                record_number,
                name: data.name,
                status: data.status,
            };
            c.patients.insert(0, patient.clone());
            patient
        };
        tracing::debug!(
            patient_id = %patient.id,
            record_number = %patient.record_number,
            "patient added"
        );
        self.notify();
        patient
    }

    /// Merge `update` into every patient whose id, national id, or record
    /// number equals `identifier`. Returns how many records matched.
    pub fn update_patient(&self, identifier: &str, update: &PatientUpdate) -> usize {
        let matched = {
            let mut c = self.lock();
            let mut matched = 0;
            for patient in c
                .patients
                .iter_mut()
                .filter(|p| p.matches_identifier(identifier))
            {
                update.apply(patient);
                matched += 1;
            }
            matched
        };
        tracing::debug!(identifier, matched, "patient update applied");
        self.notify();
        matched
    }

    // ─── Appointments ───────────────────────────────────────────────────

    /// Book an appointment in the `Scheduled` state.
    pub fn add_appointment(&self, data: NewAppointment) -> Appointment {
        let appointment = {
            let mut c = self.lock();
            let id = fresh_id(|candidate| c.appointments.iter().any(|a| a.id == candidate));
            let appointment = Appointment {
                id,
                patient_name: data.patient_name,
                provider: data.provider,
                time: data.time,
                status: AppointmentStatus::Scheduled,
            };
            c.appointments.insert(0, appointment.clone());
            appointment
        };
        tracing::debug!(appointment_id = %appointment.id, "appointment added");
        self.notify();
        appointment
    }

    /// Set the status of the appointment with exactly this id. Returns
    /// whether it existed.
    pub fn update_appointment_status(&self, id: &str, status: AppointmentStatus) -> bool {
        let found = {
            let mut c = self.lock();
            match c.appointments.iter_mut().find(|a| a.id == id) {
                Some(appointment) => {
                    appointment.status = status;
                    true
                }
                None => false,
            }
        };
        tracing::debug!(appointment_id = id, ?status, found, "appointment status update");
        self.notify();
        found
    }

    // ─── Financial records ──────────────────────────────────────────────

    /// Enter a financial record in its type's initial status.
    pub fn add_financial_record(&self, data: NewFinancialRecord) -> FinancialRecord {
        let record = {
            let mut c = self.lock();
            let id = fresh_id(|candidate| c.financials.iter().any(|f| f.id == candidate));
            let record = FinancialRecord {
                id,
                description: data.description,
                amount: data.amount,
                status: FinancialStatus::initial(data.kind),
            };
            c.financials.insert(0, record.clone());
            record
        };
        tracing::debug!(record_id = %record.id, kind = ?record.kind(), "financial record added");
        self.notify();
        record
    }

    /// Set the status of the record with exactly this id.
    ///
    /// A status belonging to a different record type leaves the record
    /// unchanged. Returns whether a record was changed.
    pub fn update_financial_status(&self, id: &str, status: FinancialStatus) -> bool {
        let changed = {
            let mut c = self.lock();
            match c.financials.iter_mut().find(|f| f.id == id) {
                Some(record) if record.kind() == status.kind() => {
                    record.status = status;
                    true
                }
                Some(record) => {
                    tracing::warn!(
                        record_id = id,
                        record_kind = ?record.kind(),
                        status_kind = ?status.kind(),
                        "financial status does not match record type, ignoring"
                    );
                    false
                }
                None => false,
            }
        };
        self.notify();
        changed
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Generate a short id not rejected by `taken`.
fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate: String = Uuid::new_v4().simple().to_string()[..ID_LEN].to_string();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

fn parse_record_number(record_number: &str) -> Option<u32> {
    record_number
        .strip_prefix(RECORD_NUMBER_PREFIX)
        .and_then(|n| n.parse().ok())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(store: &RecordStore) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = store.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    fn new_patient(name: &str, national_id: &str) -> NewPatient {
        NewPatient {
            name: name.to_string(),
            national_id: national_id.to_string(),
            status: CareStatus::Registered,
        }
    }

    #[test]
    fn test_add_patient_ids_and_record_numbers_unique() {
        let store = RecordStore::with_demo_data();
        let mut ids: HashSet<String> = store.snapshot().patients.iter().map(|p| p.id.clone()).collect();
        let mut rms: HashSet<String> = store
            .snapshot()
            .patients
            .iter()
            .map(|p| p.record_number.clone())
            .collect();

        for i in 0..50 {
            let before = store.snapshot().patients.len();
            let p = store.add_patient(new_patient(&format!("Pasien {i}"), "3301"));
            assert!(ids.insert(p.id.clone()), "duplicate id {}", p.id);
            assert!(rms.insert(p.record_number.clone()), "duplicate RM {}", p.record_number);

            let snap = store.snapshot();
            assert_eq!(snap.patients.len(), before + 1);
            assert_eq!(snap.patients[0], p, "newest patient first");
        }
    }

    #[test]
    fn test_record_numbers_continue_after_seed() {
        let store = RecordStore::with_demo_data();
        let p = store.add_patient(new_patient("Ahmad", "3301999"));
        assert_eq!(p.record_number, "RM-1027");

        let empty = RecordStore::new();
        assert_eq!(empty.add_patient(new_patient("A", "1")).record_number, "RM-1000");
    }

    #[test]
    fn test_every_mutation_notifies_exactly_once() {
        let store = RecordStore::new();
        let (count, _sub) = counting_listener(&store);

        let p = store.add_patient(new_patient("A", "1"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        store.update_patient(&p.id, &PatientUpdate::default());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        let a = store.add_appointment(NewAppointment {
            patient_name: "A".into(),
            provider: "Poli Umum".into(),
            time: "besok".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);
        store.update_appointment_status(&a.id, AppointmentStatus::Completed);
        assert_eq!(count.load(Ordering::SeqCst), 4);
        let f = store.add_financial_record(NewFinancialRecord {
            kind: FinancialKind::Claim,
            description: "Klaim".into(),
            amount: "Rp 1".into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 5);
        store.update_financial_status(&f.id, FinancialStatus::Claim(ClaimStatus::Verified));
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_listener_sees_applied_mutation() {
        let store = Arc::new(RecordStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (s, w) = (Arc::clone(&seen), Arc::downgrade(&store));
        let _sub = store.subscribe(move || {
            if let Some(store) = w.upgrade() {
                s.lock().unwrap().push(store.snapshot().patients.len());
            }
        });

        store.add_patient(new_patient("A", "1"));
        store.add_patient(new_patient("B", "2"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_update_patient_no_match_leaves_content_unchanged() {
        let store = RecordStore::with_demo_data();
        let (count, _sub) = counting_listener(&store);
        let before = store.snapshot();

        let update = PatientUpdate {
            name: Some("Nobody".into()),
            ..Default::default()
        };
        let matched = store.update_patient("does-not-exist", &update);

        assert_eq!(matched, 0);
        assert_eq!(store.snapshot(), before);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_patient_applies_to_all_matches() {
        let store = RecordStore::new();
        store.add_patient(new_patient("Twin A", "3301000000000042"));
        store.add_patient(new_patient("Twin B", "3301000000000042"));
        store.add_patient(new_patient("Other", "3301000000000099"));

        let update = PatientUpdate {
            status: Some(CareStatus::Inpatient),
            ..Default::default()
        };
        let matched = store.update_patient("3301000000000042", &update);
        assert_eq!(matched, 2);

        let snap = store.snapshot();
        for p in &snap.patients {
            if p.national_id == "3301000000000042" {
                assert_eq!(p.status, CareStatus::Inpatient);
            } else {
                assert_eq!(p.status, CareStatus::Registered);
            }
        }
    }

    #[test]
    fn test_update_patient_matches_by_id_and_record_number() {
        let store = RecordStore::with_demo_data();
        store.update_patient(
            "p1",
            &PatientUpdate {
                name: Some("Budi S.".into()),
                ..Default::default()
            },
        );
        store.update_patient(
            "RM-1025",
            &PatientUpdate {
                status: Some(CareStatus::Emergency),
                ..Default::default()
            },
        );

        let snap = store.snapshot();
        assert_eq!(snap.patients[0].name, "Budi S.");
        assert_eq!(snap.patients[0].status, CareStatus::Inpatient, "shallow merge keeps status");
        assert_eq!(snap.patients[1].status, CareStatus::Emergency);
    }

    #[test]
    fn test_financial_initial_status() {
        let store = RecordStore::new();
        let invoice = store.add_financial_record(NewFinancialRecord {
            kind: FinancialKind::Invoice,
            description: "X".into(),
            amount: "Rp 1".into(),
        });
        assert_eq!(invoice.status.label(), "Belum Lunas");

        let asset = store.add_financial_record(NewFinancialRecord {
            kind: FinancialKind::Asset,
            description: "Ventilator".into(),
            amount: "Rp 300.000.000".into(),
        });
        assert_eq!(asset.status.label(), "Pending");
        assert_eq!(asset.kind(), FinancialKind::Asset);
    }

    #[test]
    fn test_financial_record_serializes_flat() {
        let store = RecordStore::new();
        let invoice = store.add_financial_record(NewFinancialRecord {
            kind: FinancialKind::Invoice,
            description: "X".into(),
            amount: "Rp 1".into(),
        });
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["type"], "Invoice");
        assert_eq!(json["status"], "Belum Lunas");
        assert_eq!(json["amount"], "Rp 1");
    }

    #[test]
    fn test_update_financial_status_rejects_other_kind() {
        let store = RecordStore::with_demo_data();
        let changed = store.update_financial_status("f1", FinancialStatus::Asset(AssetStatus::Active));
        assert!(!changed);
        assert_eq!(store.snapshot().financials[0].status.label(), "Belum Lunas");

        assert!(store.update_financial_status("f1", FinancialStatus::Invoice(InvoiceStatus::Paid)));
        assert_eq!(store.snapshot().financials[0].status.label(), "Lunas");
        assert!(!store.update_financial_status("nope", FinancialStatus::Invoice(InvoiceStatus::Paid)));
    }

    #[test]
    fn test_appointment_status_round_trip() {
        let store = RecordStore::with_demo_data();
        let original = store.snapshot().appointments[0].status;
        assert!(store.update_appointment_status("a1", AppointmentStatus::Completed));
        assert_eq!(store.snapshot().appointments[0].status, AppointmentStatus::Completed);
        assert!(store.update_appointment_status("a1", AppointmentStatus::Scheduled));
        assert_eq!(store.snapshot().appointments[0].status, original);
    }

    #[test]
    fn test_update_appointment_missing_id_is_noop() {
        let store = RecordStore::with_demo_data();
        let before = store.snapshot();
        assert!(!store.update_appointment_status("zzz", AppointmentStatus::Cancelled));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = RecordStore::with_demo_data();
        let mut snap = store.snapshot();
        snap.patients[0].name = "Changed".into();
        snap.patients.clear();
        snap.financials.clear();

        let fresh = store.snapshot();
        assert_eq!(fresh.patients.len(), 3);
        assert_eq!(fresh.patients[0].name, "Budi Santoso");
        assert_eq!(fresh.financials.len(), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = RecordStore::new();
        let (count, sub) = counting_listener(&store);
        let (other, _keep) = counting_listener(&store);
        assert_eq!(store.listener_count(), 2);

        store.add_patient(new_patient("A", "1"));
        assert!(sub.unsubscribe());
        store.add_patient(new_patient("B", "2"));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(other.load(Ordering::SeqCst), 2);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_unsubscribe_after_store_dropped() {
        let store = RecordStore::new();
        let (_count, sub) = counting_listener(&store);
        drop(store);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_find_patient_by_national_id_or_record_number() {
        let store = RecordStore::with_demo_data();
        assert_eq!(store.find_patient("3301123456780002").unwrap().name, "Siti Aminah");
        assert_eq!(store.find_patient("RM-1026").unwrap().name, "Ahmad Dahlan");
        assert!(store.find_patient("p1").is_none(), "internal ids are not identities");
    }

    #[test]
    fn test_care_status_parsing() {
        assert_eq!("Rawat Inap".parse::<CareStatus>().unwrap(), CareStatus::Inpatient);
        assert_eq!("rawat jalan".parse::<CareStatus>().unwrap(), CareStatus::Outpatient);
        assert_eq!("IGD".parse::<CareStatus>().unwrap(), CareStatus::Emergency);
        assert_eq!("registered".parse::<CareStatus>().unwrap(), CareStatus::Registered);
        assert!("discharged".parse::<CareStatus>().is_err());
    }

    #[test]
    fn test_financials_of_filters_by_kind() {
        let snap = RecordStore::with_demo_data().snapshot();
        let invoices = snap.financials_of(FinancialKind::Invoice);
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].id, "f1");
        assert_eq!(snap.financials_of(FinancialKind::Asset)[0].id, "f2");
    }
}
