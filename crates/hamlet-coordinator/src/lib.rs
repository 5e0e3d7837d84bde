//! Hamlet Coordinator - the discrete-time barrier
//!
//! The coordinator owns the global clock and the registry of nodes. The
//! clock advances exactly when every registered villager has submitted
//! its one action for the current period; nothing else can move it.
//!
//! On advance, a [`TimeAdvanceNotice`] is fanned out to every registered
//! non-coordinator node, best effort: unreachable nodes are logged and
//! skipped, never retried, never fatal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use hamlet_types::{
    Clock, HamletError, NodeId, NodeKind, NodeRegistration, RegisterRequest, Result,
    SubmitActionRequest, SubmitActionResponse, TimeAdvanceNotice,
};

/// Transport seam for the time-advance fan-out.
///
/// The HTTP implementation lives in hamlet-client; tests substitute an
/// in-memory one.
#[async_trait::async_trait]
pub trait AdvanceNotifier: Send + Sync {
    async fn notify_advance(&self, node: &NodeRegistration, notice: TimeAdvanceNotice)
        -> Result<()>;
}

#[derive(Debug)]
struct CoordinatorState {
    clock: Clock,
    nodes: HashMap<NodeId, NodeRegistration>,
    /// Villagers that have submitted their action for the active period
    pending: HashSet<NodeId>,
}

/// The single writer of the clock.
pub struct Coordinator {
    state: RwLock<CoordinatorState>,
    notifier: Arc<dyn AdvanceNotifier>,
}

impl Coordinator {
    pub fn new(notifier: Arc<dyn AdvanceNotifier>) -> Self {
        Self {
            state: RwLock::new(CoordinatorState {
                clock: Clock::default(),
                nodes: HashMap::new(),
                pending: HashSet::new(),
            }),
            notifier,
        }
    }

    /// Idempotent upsert into the node registry. Always succeeds; entries
    /// are never deleted and may go stale.
    pub async fn register(&self, request: RegisterRequest) {
        let mut state = self.state.write().await;
        info!(id = %request.id, kind = %request.kind, address = %request.address, "node registered");
        state.nodes.insert(
            request.id.clone(),
            NodeRegistration {
                id: request.id,
                kind: request.kind,
                address: request.address,
                display_name: request.display_name,
            },
        );
    }

    /// Snapshot of the current clock. No side effect.
    pub async fn current_time(&self) -> Clock {
        self.state.read().await.clock
    }

    /// Snapshot of the node registry.
    pub async fn list_nodes(&self) -> Vec<NodeRegistration> {
        self.state.read().await.nodes.values().cloned().collect()
    }

    /// Record one villager's action for the active period.
    ///
    /// Inserting the final missing villager triggers the advance: the
    /// clock steps, the pending set clears, and the new time is fanned
    /// out to every non-coordinator node.
    pub async fn submit_action(&self, request: SubmitActionRequest) -> Result<SubmitActionResponse> {
        // Decide under the lock; the fan-out runs detached afterwards.
        let (response, fan_out) = {
            let mut state = self.state.write().await;

            let node = state
                .nodes
                .get(&request.node_id)
                .ok_or_else(|| HamletError::not_found("node", request.node_id.to_string()))?;
            if node.kind != NodeKind::Villager {
                return Err(HamletError::validation(
                    "node_id",
                    format!("{} nodes do not participate in the barrier", node.kind),
                ));
            }
            if state.pending.contains(&request.node_id) {
                return Err(HamletError::AlreadyActed {
                    node: request.node_id.to_string(),
                });
            }
            state.pending.insert(request.node_id.clone());

            let villagers: HashSet<NodeId> = state
                .nodes
                .values()
                .filter(|n| n.kind == NodeKind::Villager)
                .map(|n| n.id.clone())
                .collect();

            if state.pending == villagers {
                let new_time = state.clock.advanced();
                state.clock = new_time;
                state.pending.clear();
                info!(action = ?request.action, node = %request.node_id, time = %new_time, "barrier complete; clock advanced");

                let targets: Vec<NodeRegistration> = state
                    .nodes
                    .values()
                    .filter(|n| n.kind != NodeKind::Coordinator)
                    .cloned()
                    .collect();
                (
                    SubmitActionResponse {
                        advanced: true,
                        waiting_for: Vec::new(),
                        new_time: Some(new_time),
                    },
                    Some((targets, TimeAdvanceNotice::from(new_time))),
                )
            } else {
                let mut waiting_for: Vec<NodeId> =
                    villagers.difference(&state.pending).cloned().collect();
                waiting_for.sort_by(|a, b| a.0.cmp(&b.0));
                (
                    SubmitActionResponse {
                        advanced: false,
                        waiting_for,
                        new_time: None,
                    },
                    None,
                )
            }
        };

        if let Some((targets, notice)) = fan_out {
            // The villager completing the barrier is itself a fan-out
            // target and is still awaiting this response; the broadcast
            // must never block the reply.
            let notifier = Arc::clone(&self.notifier);
            tokio::spawn(broadcast(notifier, targets, notice));
        }
        Ok(response)
    }
}

/// Best-effort fan-out; failures are logged and otherwise ignored.
async fn broadcast(
    notifier: Arc<dyn AdvanceNotifier>,
    targets: Vec<NodeRegistration>,
    notice: TimeAdvanceNotice,
) {
    for node in &targets {
        if let Err(err) = notifier.notify_advance(node, notice).await {
            warn!(node = %node.id, address = %node.address, %err, "time-advance notice undeliverable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamlet_types::{ActionTag, Period};
    use std::sync::Mutex;
    use std::time::Duration;

    /// The fan-out runs detached; let it drain.
    async fn drain_notices() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    /// Records deliveries; optionally fails for some node ids.
    #[derive(Default)]
    struct RecordingNotifier {
        delivered: Mutex<Vec<(NodeId, TimeAdvanceNotice)>>,
        unreachable: Vec<NodeId>,
    }

    #[async_trait::async_trait]
    impl AdvanceNotifier for RecordingNotifier {
        async fn notify_advance(
            &self,
            node: &NodeRegistration,
            notice: TimeAdvanceNotice,
        ) -> Result<()> {
            if self.unreachable.contains(&node.id) {
                return Err(HamletError::unreachable(node.id.to_string(), "test"));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((node.id.clone(), notice));
            Ok(())
        }
    }

    fn villager(id: &str) -> RegisterRequest {
        RegisterRequest {
            id: NodeId::new(id),
            kind: NodeKind::Villager,
            address: format!("http://{id}"),
            display_name: None,
        }
    }

    fn submit(id: &str, action: ActionTag) -> SubmitActionRequest {
        SubmitActionRequest {
            node_id: NodeId::new(id),
            action,
        }
    }

    async fn three_villager_coordinator(notifier: Arc<RecordingNotifier>) -> Coordinator {
        let coordinator = Coordinator::new(notifier);
        coordinator.register(villager("alice")).await;
        coordinator.register(villager("bob")).await;
        coordinator.register(villager("carol")).await;
        coordinator
    }

    #[tokio::test]
    async fn test_barrier_advances_only_when_complete() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = three_villager_coordinator(notifier.clone()).await;

        let r = coordinator
            .submit_action(submit("alice", ActionTag::Work))
            .await
            .unwrap();
        assert!(!r.advanced);
        assert_eq!(r.waiting_for.len(), 2);

        let r = coordinator
            .submit_action(submit("bob", ActionTag::Sleep))
            .await
            .unwrap();
        assert!(!r.advanced);
        assert_eq!(r.waiting_for, vec![NodeId::new("carol")]);

        // Scenario C: the third submission flips the barrier.
        let r = coordinator
            .submit_action(submit("carol", ActionTag::Idle))
            .await
            .unwrap();
        assert!(r.advanced);
        assert_eq!(r.new_time, Some(Clock::new(1, Period::Noon)));

        // Every villager got the push notice.
        drain_notices().await;
        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 3);
        assert!(delivered.iter().all(|(_, n)| n.period == Period::Noon));
    }

    #[tokio::test]
    async fn test_second_submission_rejected() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = three_villager_coordinator(notifier).await;

        coordinator
            .submit_action(submit("alice", ActionTag::Work))
            .await
            .unwrap();
        let err = coordinator
            .submit_action(submit("alice", ActionTag::Sleep))
            .await
            .unwrap_err();
        assert!(matches!(err, HamletError::AlreadyActed { .. }));
    }

    #[tokio::test]
    async fn test_pending_clears_after_advance() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = three_villager_coordinator(notifier).await;

        for id in ["alice", "bob", "carol"] {
            coordinator
                .submit_action(submit(id, ActionTag::Work))
                .await
                .unwrap();
        }
        // New period: everyone may act again.
        let r = coordinator
            .submit_action(submit("alice", ActionTag::Work))
            .await
            .unwrap();
        assert!(!r.advanced);
        assert_eq!(r.waiting_for.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_node_does_not_break_advance() {
        let notifier = Arc::new(RecordingNotifier {
            delivered: Mutex::new(Vec::new()),
            unreachable: vec![NodeId::new("bob")],
        });
        let coordinator = three_villager_coordinator(notifier.clone()).await;

        for id in ["alice", "bob", "carol"] {
            let result = coordinator.submit_action(submit(id, ActionTag::Work)).await;
            assert!(result.is_ok());
        }
        assert_eq!(coordinator.current_time().await, Clock::new(1, Period::Noon));
        // Two of the three received it; bob was skipped.
        drain_notices().await;
        assert_eq!(notifier.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_villagers_gate_the_barrier() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = three_villager_coordinator(notifier.clone()).await;
        coordinator
            .register(RegisterRequest {
                id: NodeId::new("market"),
                kind: NodeKind::Registry,
                address: "http://market".to_string(),
                display_name: Some("Trade Registry".to_string()),
            })
            .await;

        for id in ["alice", "bob", "carol"] {
            coordinator
                .submit_action(submit(id, ActionTag::Work))
                .await
                .unwrap();
        }
        // Advanced without the registry; the registry still got the notice.
        assert_eq!(coordinator.current_time().await, Clock::new(1, Period::Noon));
        drain_notices().await;
        let delivered = notifier.delivered.lock().unwrap();
        assert!(delivered.iter().any(|(id, _)| id == &NodeId::new("market")));

        // And a registry may not submit actions.
        let err = coordinator
            .submit_action(submit("market", ActionTag::Idle))
            .await
            .unwrap_err();
        assert!(matches!(err, HamletError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let coordinator = Coordinator::new(notifier);
        coordinator.register(villager("alice")).await;
        coordinator.register(villager("alice")).await;
        assert_eq!(coordinator.list_nodes().await.len(), 1);
    }
}
