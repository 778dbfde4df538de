// admin.rs — Session administration: the write side of gate state.
//
// Collaborators (the host, the human, CI) maintain the state the gates
// read: capability grants, the current task scope, the workflow phase,
// flags, checklists, and the pending question. Every mutation goes
// through the store's namespaced entries; nothing here bypasses the
// ownership rule that each gate reads state only its own collaborators
// wrote.

use std::collections::BTreeSet;

use serde_json::json;
use uuid::Uuid;

use tb_gates::{
    Capability, CapabilityGrant, ChecklistItem, Flag, FlagKind, FlagStatus, PendingQuestion,
    Phase, PhaseState, Priority, TaskScope,
};
use tb_state::{ns, StateStore};

use crate::dispatcher::{Dispatcher, CHECKLIST_KEY, CURRENT, FLAGS_KEY, MODIFIED_KEY, WASTE_KEY};
use crate::error::DispatchError;

impl<S: StateStore> Dispatcher<S> {
    // ── Capability registry ──────────────────────────────────────────

    /// Register (or replace) an agent's capability grant.
    pub fn set_grant(
        &self,
        agent_id: &str,
        capabilities: BTreeSet<Capability>,
    ) -> Result<CapabilityGrant, DispatchError> {
        let grant = CapabilityGrant::new(agent_id, capabilities);
        self.store.put(
            ns::CAPABILITY_REGISTRY,
            agent_id,
            serde_json::to_value(&grant).map_err(tb_state::StateError::from)?,
            None,
        )?;
        Ok(grant)
    }

    /// The grant registered for an agent, if any.
    pub fn grant_for(&self, agent_id: &str) -> Option<CapabilityGrant> {
        self.read(ns::CAPABILITY_REGISTRY, agent_id)
    }

    /// Remove an agent's grant, returning it to orchestrator mode.
    pub fn clear_grant(&self, agent_id: &str) -> Result<(), DispatchError> {
        self.store.delete(ns::CAPABILITY_REGISTRY, agent_id)?;
        Ok(())
    }

    // ── Task scope ───────────────────────────────────────────────────

    /// Begin a task, declaring its boundaries. Replaces any current task
    /// (starting fresh work abandons the old scope).
    pub fn start_task(
        &self,
        task_id: &str,
        allowed_paths: Vec<String>,
        allowed_command_patterns: Vec<String>,
    ) -> Result<TaskScope, DispatchError> {
        let task = TaskScope::new(task_id, allowed_paths, allowed_command_patterns);
        self.store.put(
            ns::TASK_SCOPE,
            CURRENT,
            serde_json::to_value(&task).map_err(tb_state::StateError::from)?,
            None,
        )?;
        Ok(task)
    }

    /// The current task scope, if a task is active.
    pub fn current_task(&self) -> Option<TaskScope> {
        self.read(ns::TASK_SCOPE, CURRENT)
    }

    /// Complete (or abandon) the current task, destroying its scope and
    /// the session modified-file record.
    pub fn finish_task(&self) -> Result<Option<TaskScope>, DispatchError> {
        let task = self.current_task();
        self.store.delete(ns::TASK_SCOPE, CURRENT)?;
        self.store.delete(ns::MODIFIED_FILES, MODIFIED_KEY)?;
        Ok(task)
    }

    // ── Workflow phase ───────────────────────────────────────────────

    /// The current phase state (a fresh session is in `init`).
    pub fn current_phase(&self) -> PhaseState {
        self.read(ns::PHASE_STATE, CURRENT).unwrap_or_default()
    }

    /// Perform a validated phase transition and persist it.
    pub fn set_phase(&self, to: Phase) -> Result<PhaseState, DispatchError> {
        let mut state = self.current_phase();
        state.transition(to, self.config())?;
        self.store.put(
            ns::PHASE_STATE,
            CURRENT,
            serde_json::to_value(&state).map_err(tb_state::StateError::from)?,
            None,
        )?;
        Ok(state)
    }

    // ── Flags and checklist ──────────────────────────────────────────

    /// Raise a flag.
    pub fn raise_flag(
        &self,
        kind: FlagKind,
        task_id: Option<String>,
        message: &str,
    ) -> Result<Flag, DispatchError> {
        let flag = Flag::raise(kind, task_id, message);
        let raised = serde_json::to_value(&flag).map_err(tb_state::StateError::from)?;
        self.store.update(ns::FLAGS, FLAGS_KEY, None, &mut |cur| {
            let mut list = cur.and_then(|v| v.as_array().cloned()).unwrap_or_default();
            list.push(raised.clone());
            Some(serde_json::Value::Array(list))
        })?;
        Ok(flag)
    }

    /// Resolve a flag by id.
    pub fn resolve_flag(&self, id: Uuid) -> Result<Flag, DispatchError> {
        let mut resolved: Option<Flag> = None;
        self.store.update(ns::FLAGS, FLAGS_KEY, None, &mut |cur| {
            let mut list: Vec<Flag> = cur
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            if let Some(flag) = list.iter_mut().find(|f| f.id == id) {
                flag.status = FlagStatus::Resolved;
                resolved = Some(flag.clone());
            }
            serde_json::to_value(list).ok()
        })?;
        resolved.ok_or_else(|| DispatchError::NotFound(format!("flag {id}")))
    }

    /// All flags, active and resolved.
    pub fn flags(&self) -> Vec<Flag> {
        self.read(ns::FLAGS, FLAGS_KEY).unwrap_or_default()
    }

    /// Add a checklist item for a phase.
    pub fn add_checklist_item(
        &self,
        phase: Phase,
        priority: Priority,
        description: &str,
    ) -> Result<ChecklistItem, DispatchError> {
        let item = ChecklistItem::new(phase, priority, description);
        let added = serde_json::to_value(&item).map_err(tb_state::StateError::from)?;
        self.store.update(ns::FLAGS, CHECKLIST_KEY, None, &mut |cur| {
            let mut list = cur.and_then(|v| v.as_array().cloned()).unwrap_or_default();
            list.push(added.clone());
            Some(serde_json::Value::Array(list))
        })?;
        Ok(item)
    }

    /// Mark a checklist item verified.
    pub fn verify_checklist_item(&self, id: Uuid) -> Result<ChecklistItem, DispatchError> {
        let mut verified: Option<ChecklistItem> = None;
        self.store.update(ns::FLAGS, CHECKLIST_KEY, None, &mut |cur| {
            let mut list: Vec<ChecklistItem> = cur
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            if let Some(item) = list.iter_mut().find(|i| i.id == id) {
                item.verified = true;
                verified = Some(item.clone());
            }
            serde_json::to_value(list).ok()
        })?;
        verified.ok_or_else(|| DispatchError::NotFound(format!("checklist item {id}")))
    }

    /// All checklist items.
    pub fn checklist(&self) -> Vec<ChecklistItem> {
        self.read(ns::FLAGS, CHECKLIST_KEY).unwrap_or_default()
    }

    // ── Pending question ─────────────────────────────────────────────

    /// Raise a mandatory question. Until it is answered via
    /// `answer_tool`, every other event blocks.
    pub fn ask_question(
        &self,
        question: &str,
        answer_tool: &str,
    ) -> Result<PendingQuestion, DispatchError> {
        let pending = PendingQuestion::new(question, answer_tool);
        self.store.put(
            ns::PENDING_QUESTION,
            CURRENT,
            serde_json::to_value(&pending).map_err(tb_state::StateError::from)?,
            None,
        )?;
        Ok(pending)
    }

    /// Clear the pending question manually (the human answered out of
    /// band). Returns the question that was cleared, if any.
    pub fn answer_question(&self) -> Result<Option<PendingQuestion>, DispatchError> {
        let pending = self.pending_question();
        self.store.delete(ns::PENDING_QUESTION, CURRENT)?;
        Ok(pending)
    }

    /// The outstanding question, if any.
    pub fn pending_question(&self) -> Option<PendingQuestion> {
        self.read(ns::PENDING_QUESTION, CURRENT)
    }

    // ── Session accounting ───────────────────────────────────────────

    /// The running session waste estimate (tokens).
    pub fn session_waste(&self) -> u64 {
        self.read::<serde_json::Value>(ns::CALL_HISTORY, WASTE_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }

    /// Reset session accounting (waste total only; call history expires
    /// via TTL).
    pub fn reset_session_waste(&self) -> Result<(), DispatchError> {
        self.store
            .put(ns::CALL_HISTORY, WASTE_KEY, json!(0), None)?;
        Ok(())
    }
}
