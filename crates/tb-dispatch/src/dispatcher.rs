// dispatcher.rs — The gate pipeline.
//
// Evaluation order:
//   1. pending-question lock (dominates; short-circuits on BLOCK)
//   2. capability, phase, scope, flags (independent; all run, every
//      blocking explanation is carried)
//   3. merge (BLOCK > WARN > ALLOW)
//   4. side effects for permitted events (modified-file recording)
//   5. duplicate-call annotation (advisory, always last)
//   6. decision log append
//
// Store write failures degrade to ALLOW-with-warning: an unavailable
// state store must never wedge the host.

use std::sync::Mutex;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use tb_audit::{DecisionLog, DecisionRecord};
use tb_event::{classify, ClassifiedEvent, Intent, ToolCallEvent};
use tb_gates::{
    capability, duplicate, flags, phase, question, scope, CallRecord, CapabilityGrant,
    ChecklistItem, Detail, Flag, GateAnnotation, GateConfig, ModifiedFile, PendingQuestion,
    PhaseState, TaskScope, Verdict,
};
use tb_state::{ns, JsonFileStore, StateStore};

use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::overrides::OverrideContext;
use crate::response::GateResponse;

/// Key for singleton entries within a namespace.
pub(crate) const CURRENT: &str = "current";
/// Key for the session-wide modified-file list.
pub(crate) const MODIFIED_KEY: &str = "files";
/// Key for the running waste total.
pub(crate) const WASTE_KEY: &str = "session_waste";
/// Key for the flag list.
pub(crate) const FLAGS_KEY: &str = "flags";
/// Key for the checklist.
pub(crate) const CHECKLIST_KEY: &str = "checklist";

/// The dispatcher: owns the store, the gate config, and the decision log.
pub struct Dispatcher<S: StateStore> {
    pub(crate) store: S,
    config: GateConfig,
    log: Option<Mutex<DecisionLog>>,
}

impl Dispatcher<JsonFileStore> {
    /// Open the engine with the standard on-disk layout.
    pub fn open(engine: &EngineConfig) -> Result<Self, DispatchError> {
        let store = JsonFileStore::new(&engine.state_dir)?;
        let config = engine.load_gate_config();
        let log = DecisionLog::open(&engine.decision_log)?;
        Ok(Self {
            store,
            config,
            log: Some(Mutex::new(log)),
        })
    }
}

impl<S: StateStore> Dispatcher<S> {
    /// Build a dispatcher over any store, without a decision log.
    pub fn new(store: S, config: GateConfig) -> Self {
        Self {
            store,
            config,
            log: None,
        }
    }

    /// Attach a decision log (builder pattern).
    pub fn with_decision_log(mut self, log: DecisionLog) -> Self {
        self.log = Some(Mutex::new(log));
        self
    }

    /// The active gate configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The underlying store (admin operations go through this too).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluate a raw host payload.
    pub fn evaluate(&self, raw: serde_json::Value, overrides: &OverrideContext) -> GateResponse {
        self.evaluate_event(classify(ToolCallEvent::from_value(raw)), overrides)
    }

    /// Evaluate a classified event. One synchronous request/response.
    pub fn evaluate_event(
        &self,
        event: ClassifiedEvent,
        overrides: &OverrideContext,
    ) -> GateResponse {
        let mut store_errors: Vec<String> = Vec::new();

        // ── 1. Pending-question lock ─────────────────────────────────
        let pending: Option<PendingQuestion> = self.read(ns::PENDING_QUESTION, CURRENT);
        if let Some(annotation) = question::check(&event, pending.as_ref()) {
            // Persist the escalating violation count.
            let result = self.store.update(ns::PENDING_QUESTION, CURRENT, None, &mut |cur| {
                cur.map(|v| bump_violation_count(v))
            });
            if let Err(err) = result {
                store_errors.push(err.to_string());
            }
            return self.finish(&event, vec![annotation], store_errors);
        }
        // The designated answer clears the lock and resets the count.
        if pending.as_ref().is_some_and(|q| q.is_answer(&event)) {
            if let Err(err) = self.store.delete(ns::PENDING_QUESTION, CURRENT) {
                store_errors.push(err.to_string());
            }
        }

        // ── 2. Independent gates ─────────────────────────────────────
        let mut annotations = Vec::new();

        let grant: Option<CapabilityGrant> = event
            .event
            .actor_id
            .as_deref()
            .and_then(|id| self.read(ns::CAPABILITY_REGISTRY, id));
        if let Some(a) = capability::check(&event, grant.as_ref(), &self.config) {
            annotations.push(a);
        }

        let phase_state: PhaseState = self.read(ns::PHASE_STATE, CURRENT).unwrap_or_default();
        let phase_result = phase::check(&event, &phase_state, &self.config);
        push_gated(&mut annotations, phase::GATE, phase_result, overrides.phase);

        let task: Option<TaskScope> = self.read(ns::TASK_SCOPE, CURRENT);
        let scope_result = scope::check(&event, task.as_ref(), &self.config);
        push_gated(&mut annotations, scope::GATE, scope_result, overrides.scope);

        let flag_list: Vec<Flag> = self.read(ns::FLAGS, FLAGS_KEY).unwrap_or_default();
        let checklist: Vec<ChecklistItem> = self.read(ns::FLAGS, CHECKLIST_KEY).unwrap_or_default();
        if let Some(a) = flags::check(
            &event,
            &flag_list,
            &checklist,
            phase_state.current,
            &self.config,
        ) {
            annotations.push(a);
        }

        // ── 3–4. Merge, then apply side effects for permitted events ─
        let verdict = tb_gates::merge_verdicts(annotations.iter().map(|a| &a.verdict));
        if verdict != Verdict::Block && matches!(event.intent, Intent::Write | Intent::Edit) {
            if let Some(path) = event.target_path.clone() {
                self.record_modified_file(&path, task.is_some(), &mut store_errors);
            }
        }

        // ── 5. Duplicate-call intelligence, advisory, always last ────
        if event.intent.is_read_only() {
            self.annotate_duplicate(&event, &mut annotations, &mut store_errors);
        }

        self.finish(&event, annotations, store_errors)
    }

    /// Record an allowed write/edit target: once in the session-wide
    /// modified-file list, and once in the current task's scope record.
    fn record_modified_file(&self, path: &str, has_task: bool, errors: &mut Vec<String>) {
        let entry = ModifiedFile {
            path: path.to_string(),
            modified_at: Utc::now(),
        };
        let pushed = serde_json::to_value(&entry).unwrap_or(serde_json::Value::Null);

        let result = self.store.update(ns::MODIFIED_FILES, MODIFIED_KEY, None, &mut |cur| {
            let mut list = cur.and_then(|v| v.as_array().cloned()).unwrap_or_default();
            list.push(pushed.clone());
            Some(serde_json::Value::Array(list))
        });
        if let Err(err) = result {
            errors.push(err.to_string());
        }

        if has_task {
            let result = self.store.update(ns::TASK_SCOPE, CURRENT, None, &mut |cur| {
                let unchanged = cur.clone();
                match cur.and_then(|v| serde_json::from_value::<TaskScope>(v).ok()) {
                    Some(mut task) => {
                        task.record_modified(path);
                        serde_json::to_value(task).ok().or(unchanged)
                    }
                    None => unchanged,
                }
            });
            if let Err(err) = result {
                errors.push(err.to_string());
            }
        }
    }

    /// Run duplicate-call analysis and persist the call record.
    fn annotate_duplicate(
        &self,
        event: &ClassifiedEvent,
        annotations: &mut Vec<GateAnnotation>,
        errors: &mut Vec<String>,
    ) {
        let now = Utc::now();
        let sig = duplicate::signature(event);
        let previous: Option<CallRecord> = self.read(ns::CALL_HISTORY, &sig);
        let modified: Vec<ModifiedFile> =
            self.read(ns::MODIFIED_FILES, MODIFIED_KEY).unwrap_or_default();

        let analysis = duplicate::analyze(event, previous.as_ref(), &modified, &self.config, now);

        let mut session_waste: u64 = self.read(ns::CALL_HISTORY, WASTE_KEY).unwrap_or(0);
        if analysis.estimated_waste > 0 {
            match self.store.update(ns::CALL_HISTORY, WASTE_KEY, None, &mut |cur| {
                let total = cur.and_then(|v| v.as_u64()).unwrap_or(0);
                Some(json!(total + analysis.estimated_waste))
            }) {
                Ok(Some(v)) => session_waste = v.as_u64().unwrap_or(session_waste),
                Ok(None) => {}
                Err(err) => errors.push(err.to_string()),
            }
        }

        if let Some(a) = duplicate::annotation(&analysis, session_waste) {
            annotations.push(a);
        }

        let record = CallRecord {
            last_seen_at: now,
            occurrence_count: analysis.occurrence_count,
        };
        if !self.write(
            ns::CALL_HISTORY,
            &sig,
            &record,
            Some(self.config.call_history_ttl_seconds),
        ) {
            errors.push("failed to persist call record".to_string());
        }
    }

    /// Merge, surface store trouble as a warning, and write the decision
    /// log entry.
    fn finish(
        &self,
        event: &ClassifiedEvent,
        mut annotations: Vec<GateAnnotation>,
        store_errors: Vec<String>,
    ) -> GateResponse {
        if !store_errors.is_empty() {
            let error = store_errors.join("; ");
            warn!(%error, "state store trouble during evaluation, degrading");
            annotations.push(
                GateAnnotation::new(
                    "state_store",
                    Verdict::Warn,
                    format!("state store unavailable, evaluation degraded: {error}"),
                )
                .with_detail(Detail::StoreUnavailable { error }),
            );
        }

        let response = GateResponse::from_annotations(annotations);

        let overridden: Vec<String> = response
            .annotations
            .iter()
            .filter(|a| matches!(a.detail, Some(Detail::Overridden { .. })))
            .map(|a| a.gate.clone())
            .collect();

        if let Some(log) = &self.log {
            let mut record = DecisionRecord::new(
                event.event.actor_id.clone(),
                event.event.tool_name.clone(),
                response.verdict,
                response.annotations.clone(),
                overridden,
            );
            match log.lock() {
                Ok(mut log) => {
                    if let Err(err) = log.append(&mut record) {
                        warn!(%err, "failed to append decision record");
                    }
                }
                Err(_) => warn!("decision log lock poisoned, skipping append"),
            }
        }

        response
    }

    /// Read and deserialize a state value; any failure reads as absent.
    pub(crate) fn read<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let value = self.store.get(namespace, key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(namespace, key, %err, "undecodable state entry, treating as absent");
                None
            }
        }
    }

    /// Serialize and write a state value; returns false on failure.
    pub(crate) fn write<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                warn!(namespace, key, %err, "failed to serialize state entry");
                return false;
            }
        };
        match self.store.put(namespace, key, value, ttl_seconds) {
            Ok(()) => true,
            Err(err) => {
                warn!(namespace, key, %err, "failed to write state entry");
                false
            }
        }
    }
}

/// Push a gate result, honoring its override switch. Overrides force
/// ALLOW but are always visible in the annotations and the log.
fn push_gated(
    annotations: &mut Vec<GateAnnotation>,
    gate: &str,
    result: Option<GateAnnotation>,
    overridden: bool,
) {
    match (result, overridden) {
        (Some(original), true) => {
            info!(gate, "override switch forced ALLOW past a {}", original.verdict);
            annotations.push(
                GateAnnotation::new(
                    gate,
                    Verdict::Allow,
                    format!("overridden: {}", original.explanation),
                )
                .with_detail(Detail::Overridden {
                    would_have_blocked: original.verdict == Verdict::Block,
                }),
            );
        }
        (Some(original), false) => annotations.push(original),
        (None, true) => {
            info!(gate, "override switch set but the gate had no objection");
            annotations.push(
                GateAnnotation::new(gate, Verdict::Allow, "override switch set; gate had no objection")
                    .with_detail(Detail::Overridden {
                        would_have_blocked: false,
                    }),
            );
        }
        (None, false) => {}
    }
}

/// Bump the violation counter inside a serialized PendingQuestion.
fn bump_violation_count(value: serde_json::Value) -> serde_json::Value {
    match serde_json::from_value::<PendingQuestion>(value.clone()) {
        Ok(mut q) => {
            q.violation_count += 1;
            serde_json::to_value(q).unwrap_or(value)
        }
        Err(_) => value,
    }
}
