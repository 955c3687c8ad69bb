// libs/wizard-cell/src/models.rs
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WizardError;

// ==============================================================================
// STEPS AND FIELDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    ChooseFlow,
    SelectPrimary,
    SelectSecondary,
    SelectDateTime,
    Confirm,
    Success,
    VitalsTab,
    PaymentTab,
    ReadyForDoctor,
}

impl StepId {
    /// Display-only states reached through a successful submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepId::Success | StepId::ReadyForDoctor)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepId::ChooseFlow => write!(f, "choose_flow"),
            StepId::SelectPrimary => write!(f, "select_primary"),
            StepId::SelectSecondary => write!(f, "select_secondary"),
            StepId::SelectDateTime => write!(f, "select_date_time"),
            StepId::Confirm => write!(f, "confirm"),
            StepId::Success => write!(f, "success"),
            StepId::VitalsTab => write!(f, "vitals_tab"),
            StepId::PaymentTab => write!(f, "payment_tab"),
            StepId::ReadyForDoctor => write!(f, "ready_for_doctor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    PatientId,
    AppointmentType,
    HospitalId,
    DoctorId,
    Date,
    Slot,
    AppointmentId,
    BloodPressure,
    Pulse,
    Temperature,
    Weight,
    OxygenSaturation,
    PaymentAmount,
    PaymentMethod,
    Notes,
}

impl FieldKey {
    pub const ALL: [FieldKey; 15] = [
        FieldKey::PatientId,
        FieldKey::AppointmentType,
        FieldKey::HospitalId,
        FieldKey::DoctorId,
        FieldKey::Date,
        FieldKey::Slot,
        FieldKey::AppointmentId,
        FieldKey::BloodPressure,
        FieldKey::Pulse,
        FieldKey::Temperature,
        FieldKey::Weight,
        FieldKey::OxygenSaturation,
        FieldKey::PaymentAmount,
        FieldKey::PaymentMethod,
        FieldKey::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::PatientId => "patient_id",
            FieldKey::AppointmentType => "appointment_type",
            FieldKey::HospitalId => "hospital_id",
            FieldKey::DoctorId => "doctor_id",
            FieldKey::Date => "date",
            FieldKey::Slot => "slot",
            FieldKey::AppointmentId => "appointment_id",
            FieldKey::BloodPressure => "blood_pressure",
            FieldKey::Pulse => "pulse",
            FieldKey::Temperature => "temperature",
            FieldKey::Weight => "weight",
            FieldKey::OxygenSaturation => "oxygen_saturation",
            FieldKey::PaymentAmount => "payment_amount",
            FieldKey::PaymentMethod => "payment_method",
            FieldKey::Notes => "notes",
        }
    }

    /// camelCase name used in query strings and request bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldKey::PatientId => "patientId",
            FieldKey::AppointmentType => "appointmentType",
            FieldKey::HospitalId => "hospitalId",
            FieldKey::DoctorId => "doctorId",
            FieldKey::Date => "date",
            FieldKey::Slot => "slot",
            FieldKey::AppointmentId => "appointmentId",
            FieldKey::BloodPressure => "bloodPressure",
            FieldKey::Pulse => "pulse",
            FieldKey::Temperature => "temperature",
            FieldKey::Weight => "weight",
            FieldKey::OxygenSaturation => "oxygenSaturation",
            FieldKey::PaymentAmount => "paymentAmount",
            FieldKey::PaymentMethod => "paymentMethod",
            FieldKey::Notes => "notes",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    /// Accepts both the snake_case name and the camelCase wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s || key.wire_name() == s)
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

/// Remote collections a wizard can list from or create into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Patients,
    Hospitals,
    Doctors,
    AvailableDates,
    AvailableSlots,
    TriageQueue,
    Appointments,
    TriageRecords,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Patients => write!(f, "patients"),
            ResourceType::Hospitals => write!(f, "hospitals"),
            ResourceType::Doctors => write!(f, "doctors"),
            ResourceType::AvailableDates => write!(f, "available_dates"),
            ResourceType::AvailableSlots => write!(f, "available_slots"),
            ResourceType::TriageQueue => write!(f, "triage_queue"),
            ResourceType::Appointments => write!(f, "appointments"),
            ResourceType::TriageRecords => write!(f, "triage_records"),
        }
    }
}

// ==============================================================================
// OPTIONS AND SELECTIONS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardOption {
    pub id: String,
    pub display_label: String,
    #[serde(default)]
    pub metadata: Value,
}

impl WizardOption {
    pub fn new(id: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_label: display_label.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Choice(WizardOption),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// The value as it is sent to the backend: option ids for choices.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Choice(option) => option.id.clone(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            FieldValue::Text(text) => text.trim().parse().ok(),
            FieldValue::Choice(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            FieldValue::Choice(option) => option.display_label.clone(),
            other => other.as_text(),
        }
    }
}

/// Everything gathered so far. Only the wizard's own transition functions mutate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Selections(BTreeMap<FieldKey, FieldValue>);

impl Selections {
    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: FieldKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn text(&self, key: FieldKey) -> Option<String> {
        self.get(key).map(FieldValue::as_text)
    }

    pub fn number(&self, key: FieldKey) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, key: FieldKey, value: FieldValue) {
        self.0.insert(key, value);
    }

    pub(crate) fn remove(&mut self, key: FieldKey) -> Option<FieldValue> {
        self.0.remove(&key)
    }
}

/// Query parameters derived from the selections a lookup depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, String>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ==============================================================================
// STEP GRAPH
// ==============================================================================

#[derive(Debug, Clone, Copy)]
pub enum NextStep {
    To(StepId),
    Computed(fn(&Selections) -> StepId),
    /// Confirmation step: leaving it forward happens only through submission.
    Finish,
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: StepId,
    pub required_fields: Vec<FieldKey>,
    pub next: NextStep,
}

impl StepDefinition {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            required_fields: Vec::new(),
            next: NextStep::Finish,
        }
    }

    pub fn requires(mut self, fields: impl IntoIterator<Item = FieldKey>) -> Self {
        self.required_fields.extend(fields);
        self
    }

    pub fn then(mut self, next: StepId) -> Self {
        self.next = NextStep::To(next);
        self
    }

    pub fn branch(mut self, choose: fn(&Selections) -> StepId) -> Self {
        self.next = NextStep::Computed(choose);
        self
    }

    pub fn missing(&self, selections: &Selections) -> Vec<FieldKey> {
        self.required_fields
            .iter()
            .copied()
            .filter(|key| !selections.contains(*key))
            .collect()
    }

    pub fn resolve_next(&self, selections: &Selections) -> Option<StepId> {
        match self.next {
            NextStep::To(step) => Some(step),
            NextStep::Computed(choose) => Some(choose(selections)),
            NextStep::Finish => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupDefinition {
    pub key: FieldKey,
    pub step: StepId,
    pub resource: ResourceType,
    pub depends_on: Vec<FieldKey>,
}

impl LookupDefinition {
    pub fn depends_on_any(&self, keys: &[FieldKey]) -> bool {
        self.depends_on.iter().any(|dep| keys.contains(dep))
    }
}

#[derive(Debug, Clone)]
pub struct StepGraph {
    initial: StepId,
    terminal: StepId,
    steps: Vec<StepDefinition>,
    dependents: BTreeMap<FieldKey, Vec<FieldKey>>,
    lookups: Vec<LookupDefinition>,
    defaults: Vec<(FieldKey, FieldValue)>,
}

impl StepGraph {
    pub fn builder(initial: StepId) -> StepGraphBuilder {
        StepGraphBuilder {
            initial,
            steps: Vec::new(),
            dependents: BTreeMap::new(),
            lookups: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn initial(&self) -> StepId {
        self.initial
    }

    pub fn terminal(&self) -> StepId {
        self.terminal
    }

    pub fn step(&self, id: StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Whether `id` is a step the flow is submitted from.
    pub fn is_confirmation(&self, id: StepId) -> bool {
        self.step(id)
            .is_some_and(|step| matches!(step.next, NextStep::Finish))
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn lookups(&self) -> &[LookupDefinition] {
        &self.lookups
    }

    pub fn lookup(&self, key: FieldKey) -> Option<&LookupDefinition> {
        self.lookups.iter().find(|lookup| lookup.key == key)
    }

    pub fn lookups_for_step(&self, step: StepId) -> impl Iterator<Item = &LookupDefinition> {
        self.lookups.iter().filter(move |lookup| lookup.step == step)
    }

    pub fn defaults(&self) -> &[(FieldKey, FieldValue)] {
        &self.defaults
    }

    /// Every field that has to be cleared when `key` changes, following dependency
    /// edges transitively. `key` itself is not included.
    pub fn derived_from(&self, key: FieldKey) -> Vec<FieldKey> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<FieldKey> = VecDeque::from([key]);
        let mut ordered = Vec::new();

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents.get(&current).into_iter().flatten() {
                if *dependent != key && seen.insert(*dependent) {
                    ordered.push(*dependent);
                    queue.push_back(*dependent);
                }
            }
        }

        ordered
    }

    /// Steps the user will walk through given the current selections, from the initial
    /// step up to the confirmation step.
    pub fn path(&self, selections: &Selections) -> Vec<StepId> {
        let mut path = Vec::new();
        let mut cursor = Some(self.initial);

        while let Some(id) = cursor {
            if path.contains(&id) {
                break;
            }
            let Some(step) = self.step(id) else {
                break;
            };
            path.push(id);
            cursor = step.resolve_next(selections);
        }

        path
    }
}

pub struct StepGraphBuilder {
    initial: StepId,
    steps: Vec<StepDefinition>,
    dependents: BTreeMap<FieldKey, Vec<FieldKey>>,
    lookups: Vec<LookupDefinition>,
    defaults: Vec<(FieldKey, FieldValue)>,
}

impl StepGraphBuilder {
    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Declares that changing `key` invalidates `dependents`.
    pub fn invalidates(mut self, key: FieldKey, dependents: impl IntoIterator<Item = FieldKey>) -> Self {
        self.dependents.entry(key).or_default().extend(dependents);
        self
    }

    pub fn lookup(
        mut self,
        key: FieldKey,
        step: StepId,
        resource: ResourceType,
        depends_on: impl IntoIterator<Item = FieldKey>,
    ) -> Self {
        self.lookups.push(LookupDefinition {
            key,
            step,
            resource,
            depends_on: depends_on.into_iter().collect(),
        });
        self
    }

    pub fn default_value(mut self, key: FieldKey, value: FieldValue) -> Self {
        self.defaults.push((key, value));
        self
    }

    pub fn build(self, terminal: StepId) -> Result<StepGraph, WizardError> {
        let defined: BTreeSet<StepId> = self.steps.iter().map(|step| step.id).collect();

        if defined.len() != self.steps.len() {
            return Err(WizardError::Definition("duplicate step definition".to_string()));
        }
        if !defined.contains(&self.initial) {
            return Err(WizardError::Definition(format!(
                "initial step {} has no definition",
                self.initial
            )));
        }
        if !terminal.is_terminal() || defined.contains(&terminal) {
            return Err(WizardError::Definition(format!(
                "{} cannot be used as the terminal step",
                terminal
            )));
        }
        if !self.steps.iter().any(|step| matches!(step.next, NextStep::Finish)) {
            return Err(WizardError::Definition("flow has no confirmation step".to_string()));
        }
        for step in &self.steps {
            if let NextStep::To(next) = step.next {
                if !defined.contains(&next) {
                    return Err(WizardError::Definition(format!(
                        "step {} leads to undefined step {}",
                        step.id, next
                    )));
                }
            }
        }
        for lookup in &self.lookups {
            if !defined.contains(&lookup.step) {
                return Err(WizardError::Definition(format!(
                    "lookup for {} is attached to undefined step {}",
                    lookup.key, lookup.step
                )));
            }
        }

        Ok(StepGraph {
            initial: self.initial,
            terminal,
            steps: self.steps,
            dependents: self.dependents,
            lookups: self.lookups,
            defaults: self.defaults,
        })
    }
}

// ==============================================================================
// WIZARD STATE
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub(crate) selections: Selections,
    pub(crate) step_history: Vec<StepId>,
}

impl WizardState {
    pub fn new(initial: StepId) -> Self {
        Self {
            selections: Selections::default(),
            step_history: vec![initial],
        }
    }

    pub fn current_step(&self) -> StepId {
        // history is created with one entry and retreat never pops the last one
        self.step_history[self.step_history.len() - 1]
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn step_history(&self) -> &[StepId] {
        &self.step_history
    }
}

// ==============================================================================
// REMOTE OPTIONS AND SUBMISSION
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub message: String,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOptionSet {
    pub key: FieldKey,
    pub options: Vec<WizardOption>,
    pub loading: bool,
    pub error: Option<FetchFailure>,
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl RemoteOptionSet {
    pub fn empty(key: FieldKey) -> Self {
        Self {
            key,
            options: Vec::new(),
            loading: false,
            error: None,
            generation: 0,
        }
    }

    pub fn find(&self, option_id: &str) -> Option<&WizardOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub id: String,
    #[serde(default)]
    pub summary_fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    InFlight,
    Succeeded { confirmation: ConfirmationRecord },
    Failed { message: String },
}

/// Read-only snapshot handed to whatever renders the wizard.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub flow: String,
    pub current_step: StepId,
    pub step_history: Vec<StepId>,
    pub selections: Selections,
    pub option_sets: Vec<RemoteOptionSet>,
    pub missing_fields: Vec<FieldKey>,
    pub can_submit: bool,
    pub submission: SubmissionStatus,
}
