//! Response Ledger
//!
//! Authoritative in-process record of every dispatch attempt. A single
//! mutex around the store gives linearizable read-after-write visibility
//! and makes the duplicate-suppression check-and-insert atomic.
//!
//! Entries are never removed except by an explicit `clear()`.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::logic::transport::payload::TriggerPayload;

use super::types::{ActionKind, AlertRequest, AlertStatus};

/// Outcome of the atomic begin operation.
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// A new request was created in `Pending` state.
    Created(AlertRequest),
    /// A non-terminal request already exists for this `(detection, action)`
    /// key; the duplicate submission was suppressed.
    Existing(AlertRequest),
}

#[derive(Debug, Default)]
struct LedgerInner {
    entries: HashMap<Uuid, AlertRequest>,
    /// Insertion order, for stable listings.
    order: Vec<Uuid>,
    /// Non-terminal request per `(detection_id, action)` key. At most one
    /// entry per key by construction.
    in_flight: HashMap<(String, ActionKind), Uuid>,
}

/// Query filter for audit/log display.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub detection_id: Option<String>,
    pub action: Option<ActionKind>,
    pub status: Option<AlertStatus>,
}

impl LedgerFilter {
    fn matches(&self, req: &AlertRequest) -> bool {
        self.detection_id
            .as_ref()
            .map_or(true, |id| &req.detection_id == id)
            && self.action.map_or(true, |a| req.action == a)
            && self.status.map_or(true, |s| req.status == s)
    }
}

#[derive(Debug, Default)]
pub struct ResponseLedger {
    inner: Mutex<LedgerInner>,
}

impl ResponseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check for an in-flight request for `(detection_id,
    /// action)` and create a `Pending` one if none exists. This is the
    /// critical section that serializes same-key submissions.
    pub fn begin(
        &self,
        detection_id: &str,
        action: ActionKind,
        payload: TriggerPayload,
    ) -> BeginOutcome {
        let mut inner = self.inner.lock();
        let key = (detection_id.to_string(), action);

        if let Some(id) = inner.in_flight.get(&key) {
            if let Some(existing) = inner.entries.get(id) {
                if !existing.status.is_terminal() {
                    log::debug!(
                        "Duplicate suppressed for ({}, {}): request {} still {}",
                        detection_id,
                        action,
                        existing.id,
                        existing.status.as_str()
                    );
                    return BeginOutcome::Existing(existing.clone());
                }
            }
        }

        let req = AlertRequest::new(detection_id, action, payload);
        inner.in_flight.insert(key, req.id);
        inner.order.push(req.id);
        inner.entries.insert(req.id, req.clone());
        BeginOutcome::Created(req)
    }

    /// Write a request state back. Once this returns, any subsequent read
    /// observes the update.
    pub fn upsert(&self, req: &AlertRequest) {
        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&req.id) {
            inner.order.push(req.id);
        }
        if req.status.is_terminal() {
            if inner.in_flight.get(&req.key()) == Some(&req.id) {
                inner.in_flight.remove(&req.key());
            }
        } else {
            inner.in_flight.insert(req.key(), req.id);
        }
        inner.entries.insert(req.id, req.clone());
    }

    /// Most recent request for the key, terminal or not.
    pub fn get(&self, detection_id: &str, action: ActionKind) -> Option<AlertRequest> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.entries.get(id))
            .find(|r| r.detection_id == detection_id && r.action == action)
            .cloned()
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<AlertRequest> {
        self.inner.lock().entries.get(&id).cloned()
    }

    pub fn list_by_detection(&self, detection_id: &str) -> Vec<AlertRequest> {
        self.list_all(&LedgerFilter {
            detection_id: Some(detection_id.to_string()),
            ..Default::default()
        })
    }

    /// All matching entries in creation order.
    pub fn list_all(&self, filter: &LedgerFilter) -> Vec<AlertRequest> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Number of requests not yet in a terminal state.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Administrative clear. Drops all entries, in-flight keys included.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        inner.in_flight.clear();
        log::info!("Response ledger cleared ({} entries dropped)", dropped);
    }
}
