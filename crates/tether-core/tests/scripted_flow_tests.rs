//! End-to-end flows with attempts running on their own tasks
//!
//! Scripted attempts report progress asynchronously, so these tests wait on
//! the reconciler's state instead of stepping it by hand.

use std::sync::Arc;

use futures::future::join_all;
use tether_core::{
    ConnectionReconciler, ConnectionSettings, ConnectionState, NetworkState, ReconcilerBuilder,
    ReconcilerConfig,
};
use tether_harness::{
    AttemptScript, MockNetwork, RecordingListener, RecordingRegistry, ScriptStep,
    ScriptedAttemptFactory,
};
use tokio::runtime::Handle;
use tokio::time::{sleep, timeout, Duration};

const WAIT: Duration = Duration::from_secs(2);

struct Flow {
    reconciler: Arc<ConnectionReconciler>,
    network: Arc<MockNetwork>,
    registry: Arc<RecordingRegistry>,
    listener: Arc<RecordingListener>,
}

fn create_flow(scripts: Vec<AttemptScript>) -> Flow {
    let network = Arc::new(MockNetwork::available());
    let registry = Arc::new(RecordingRegistry::new());
    let listener = Arc::new(RecordingListener::new());

    let reconciler = ReconcilerBuilder::new(
        ConnectionSettings::new("example.org", "alice").with_resource("laptop"),
    )
    .with_config(ReconcilerConfig::testing())
    .network(network.clone())
    .attempt_factory(Arc::new(ScriptedAttemptFactory::new(
        scripts,
        Handle::current(),
    )))
    .registry(registry.clone())
    .listener(listener.clone())
    .build()
    .expect("Failed to build reconciler");

    Flow {
        reconciler,
        network,
        registry,
        listener,
    }
}

async fn wait_for_state(reconciler: &ConnectionReconciler, expected: ConnectionState) {
    let reached = timeout(WAIT, async {
        while reconciler.state() != expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "Timed out waiting for {expected}, still {}",
        reconciler.state()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scripted_connect() {
    let flow = create_flow(vec![AttemptScript::success()]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;

    assert_eq!(
        flow.reconciler.bound_address().as_deref(),
        Some("alice@example.org/laptop")
    );
    assert_eq!(
        flow.listener.transitions(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Authentication,
            ConnectionState::Connected,
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconcile_from_plain_thread() {
    let flow = create_flow(vec![AttemptScript::success()]);

    let reconciler = flow.reconciler.clone();
    let caller = std::thread::spawn(move || reconciler.reconcile(true));
    assert!(caller.join().expect("Caller thread panicked"));

    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;
    assert_eq!(flow.reconciler.stats().attempts_started, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scripted_registration() {
    let flow = create_flow(vec![AttemptScript::success()]);
    flow.reconciler.register_account();

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;

    assert!(!flow.reconciler.is_register_account());
    assert!(flow
        .listener
        .transitions()
        .contains(&ConnectionState::Registration));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refused_then_retry() {
    let flow = create_flow(vec![AttemptScript::refused(), AttemptScript::success()]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Waiting).await;
    assert_eq!(flow.listener.failures(), 1);

    flow.reconciler.reconcile(false);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;
    assert_eq!(flow.reconciler.stats().attempts_started, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redirect_then_connect() {
    let flow = create_flow(vec![
        AttemptScript::redirect("other.example.org", 5223),
        AttemptScript::success(),
    ]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;

    let stats = flow.reconciler.stats();
    assert_eq!(stats.redirects_followed, 1);
    assert_eq!(stats.attempts_started, 2);
    assert_eq!(flow.registry.total_closed(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_endless_redirects_give_up() {
    let flow = create_flow(vec![AttemptScript::redirect("loop.example.org", 5222)]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Waiting).await;

    let max = ReconcilerConfig::testing().max_redirects as u64;
    assert_eq!(flow.reconciler.stats().redirects_followed, max);
    assert_eq!(flow.reconciler.stats().attempts_started, max + 1);
    assert_eq!(flow.listener.failures(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_auth_failure_reaches_listener() {
    let flow = create_flow(vec![AttemptScript::auth_failure(), AttemptScript::success()]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Waiting).await;

    assert!(flow
        .listener
        .events()
        .iter()
        .any(|event| matches!(event, tether_core::ConnectionEvent::AuthFailed { .. })));
    assert_eq!(flow.listener.failures(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_network_flap_reconnects() {
    let flow = create_flow(vec![AttemptScript::success()]);
    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;

    flow.network.set(NetworkState::Suppressed);
    assert!(flow.reconciler.reconcile(false));
    assert_eq!(flow.reconciler.state(), ConnectionState::Waiting);

    // The torn-down session reports its close; only the registry hears it
    let closed = timeout(WAIT, async {
        while flow.registry.total_closed() < 2 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(closed.is_ok());
    assert_eq!(flow.reconciler.state(), ConnectionState::Waiting);

    flow.network.set(NetworkState::Available);
    assert!(flow.reconciler.reconcile(false));
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;
    assert_eq!(flow.listener.failures(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_force_reconnect_mid_handshake() {
    let slow = AttemptScript::new(vec![
        ScriptStep::Connected,
        ScriptStep::Pause(Duration::from_millis(200)),
        ScriptStep::Authorized,
    ]);
    let flow = create_flow(vec![slow, AttemptScript::success()]);

    flow.reconciler.reconcile(true);
    wait_for_state(&flow.reconciler, ConnectionState::Authentication).await;
    let first = flow.reconciler.current_attempt();

    flow.reconciler.force_reconnect();
    assert_ne!(flow.reconciler.current_attempt(), first);

    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;
    assert!(flow.reconciler.is_user_requested());
    assert_eq!(flow.reconciler.stats().attempts_started, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_keep_invariants() {
    let flow = create_flow(vec![AttemptScript::success()]);
    let mut tasks = Vec::new();

    for worker in 0..8 {
        let reconciler = flow.reconciler.clone();
        let network = flow.network.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..20 {
                match (worker + round) % 4 {
                    0 => network.set(NetworkState::Available),
                    1 => network.set(NetworkState::Suppressed),
                    _ => {}
                }
                reconciler.reconcile(round % 3 == 0);
                if round % 7 == 0 {
                    reconciler.force_reconnect();
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for result in join_all(tasks).await {
        result.expect("Worker panicked");
    }

    flow.network.set(NetworkState::Available);
    flow.reconciler.reconcile(false);
    wait_for_state(&flow.reconciler, ConnectionState::Connected).await;
    assert!(flow.reconciler.current_attempt().is_some());
}
