//! End-to-end scan behaviour against in-memory transports and resolvers.

use async_trait::async_trait;
use portprobe::scanner::{Resolver, ScanConfig, ScanCoordinator, ScanEvent, Transport};
use portprobe::{ConnectError, PortState, ScanError};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Resolves a fixed set of names; everything else is unresolvable.
struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    fn localhost() -> Arc<Self> {
        let mut hosts = HashMap::new();
        hosts.insert("localhost".to_string(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        hosts.insert("10.0.0.1".to_string(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        Arc::new(Self { hosts })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            hosts: HashMap::new(),
        })
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ScanError> {
        self.hosts
            .get(host)
            .copied()
            .ok_or_else(|| ScanError::HostUnresolvable {
                host: host.to_string(),
                reason: "no such host".to_string(),
            })
    }
}

/// Scripted transport that records every attempt and the peak number of
/// concurrent attempts.
struct MockTransport {
    open: HashSet<u16>,
    delay: Duration,
    failure: ConnectError,
    attempts: Mutex<Vec<u16>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    fn new(open: &[u16], delay: Duration, failure: ConnectError) -> Arc<Self> {
        Arc::new(Self {
            open: open.iter().copied().collect(),
            delay,
            failure,
            attempts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn attempts(&self) -> Vec<u16> {
        self.attempts.lock().unwrap().clone()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ConnectError> {
        self.attempts.lock().unwrap().push(addr.port());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let outcome = if self.delay > timeout {
            tokio::time::sleep(timeout).await;
            Err(ConnectError::TimedOut)
        } else {
            tokio::time::sleep(self.delay).await;
            if self.open.contains(&addr.port()) {
                Ok(())
            } else {
                Err(self.failure.clone())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Answers every port as open after a per-port delay.
struct StaggeredTransport {
    delays: HashMap<u16, Duration>,
}

#[async_trait]
impl Transport for StaggeredTransport {
    async fn connect(&self, addr: SocketAddr, _: Duration) -> Result<(), ConnectError> {
        if let Some(delay) = self.delays.get(&addr.port()) {
            tokio::time::sleep(*delay).await;
        }
        Ok(())
    }
}

fn coordinator(
    config: ScanConfig,
    transport: Arc<MockTransport>,
    resolver: Arc<StaticResolver>,
) -> ScanCoordinator {
    ScanCoordinator::with_components(config, transport, resolver).unwrap()
}

#[tokio::test]
async fn single_open_port_reports_tcpmux() {
    let transport = MockTransport::new(&[1], Duration::ZERO, ConnectError::Refused);
    let scanner = coordinator(ScanConfig::default(), transport, StaticResolver::localhost());

    let mut handle = scanner.start_scan("localhost", 1, 1).unwrap();
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![ScanEvent::Open {
            port: 1,
            service: "tcpmux".to_string()
        }]
    );
    assert_eq!(events[0].to_string(), "[OPEN] Port 1 (tcpmux)");
}

#[tokio::test]
async fn events_arrive_in_completion_order() {
    let mut delays = HashMap::new();
    delays.insert(1, Duration::from_millis(200));
    let transport = Arc::new(StaggeredTransport { delays });
    let scanner =
        ScanCoordinator::with_components(ScanConfig::default(), transport, StaticResolver::localhost())
            .unwrap();

    let mut handle = scanner.start_scan("localhost", 1, 2).unwrap();
    let mut ports = Vec::new();
    while let Some(event) = handle.next_event().await {
        ports.push(event.port().unwrap());
    }

    assert_eq!(ports, vec![2, 1]);
    assert!(handle.finish().await.unwrap().is_complete());
}

#[tokio::test]
async fn unresolvable_host_fails_once_without_probing() {
    let transport = MockTransport::new(&[], Duration::ZERO, ConnectError::Refused);
    let scanner = coordinator(ScanConfig::default(), transport.clone(), StaticResolver::empty());

    let mut handle = scanner.start_scan("10.0.0.1", 1, 10).unwrap();
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }

    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ScanEvent::Failed {
            error: ScanError::HostUnresolvable { host, .. }
        } if host == "10.0.0.1"
    ));
    assert!(transport.attempts().is_empty());

    let summary = handle.finish().await.unwrap();
    assert!(summary.failed);
    assert_eq!(summary.probed, 0);
}

#[tokio::test]
async fn unreachable_ports_end_cleanly_with_no_events() {
    let transport = MockTransport::new(
        &[],
        Duration::ZERO,
        ConnectError::Unreachable("host unreachable".into()),
    );
    let scanner = coordinator(ScanConfig::default(), transport.clone(), StaticResolver::localhost());

    let mut handle = scanner.start_scan("10.0.0.1", 1, 10).unwrap();
    assert_eq!(handle.next_event().await, None);

    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.probed, 10);
    assert_eq!(summary.open, 0);
    assert_eq!(summary.filtered, 10);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn inverted_range_is_rejected_before_probing() {
    let transport = MockTransport::new(&[50, 100], Duration::ZERO, ConnectError::Refused);
    let scanner = coordinator(ScanConfig::default(), transport.clone(), StaticResolver::localhost());

    let err = scanner.start_scan("localhost", 100, 50).unwrap_err();
    assert_eq!(err, ScanError::InvalidRange { start: 100, end: 50 });

    tokio::task::yield_now().await;
    assert!(transport.attempts().is_empty());
    assert!(scanner.pool().is_idle());
}

#[tokio::test]
async fn every_port_probed_exactly_once() {
    let transport = MockTransport::new(&[3, 17, 42], Duration::from_millis(1), ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default().with_closed(),
        transport.clone(),
        StaticResolver::localhost(),
    );

    let mut handle = scanner.start_scan("localhost", 1, 300).unwrap();
    let mut seen = HashSet::new();
    let mut open = Vec::new();
    while let Some(event) = handle.next_event().await {
        let port = event.port().unwrap();
        assert!(seen.insert(port), "port {} reported twice", port);
        if let ScanEvent::Open { port, .. } = event {
            open.push(port);
        }
    }

    assert_eq!(seen.len(), 300);
    open.sort_unstable();
    assert_eq!(open, vec![3, 17, 42]);

    let mut attempts = transport.attempts();
    attempts.sort_unstable();
    assert_eq!(attempts, (1..=300).collect::<Vec<u16>>());

    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.probed, 300);
    assert_eq!(summary.closed, 297);
}

#[tokio::test]
async fn closed_port_classification_is_repeatable() {
    let transport = MockTransport::new(&[], Duration::ZERO, ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default().with_closed(),
        transport,
        StaticResolver::localhost(),
    );

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let mut handle = scanner.start_scan("localhost", 81, 81).unwrap();
        outcomes.push(handle.next_event().await.unwrap());
        assert_eq!(handle.next_event().await, None);
    }

    assert_eq!(outcomes[0], outcomes[1]);
    match &outcomes[0] {
        ScanEvent::NotOpen(result) => assert_eq!(result.state, PortState::Closed),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_pool_capacity() {
    let transport = MockTransport::new(&[], Duration::from_millis(5), ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default().with_max_concurrency(100),
        transport.clone(),
        StaticResolver::localhost(),
    );

    let summary = scanner
        .start_scan("localhost", 1, 1000)
        .unwrap()
        .finish()
        .await
        .unwrap();

    assert_eq!(summary.probed, 1000);
    assert!(transport.peak() <= 100, "peak was {}", transport.peak());
    assert!(transport.peak() > 1);
    assert!(scanner.pool().is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn small_pool_is_respected() {
    let transport = MockTransport::new(&[], Duration::from_millis(2), ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default().with_max_concurrency(3),
        transport.clone(),
        StaticResolver::localhost(),
    );

    scanner
        .start_scan("localhost", 1, 60)
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert!(transport.peak() <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fast_closed_ports_finish_in_rounds_not_timeouts() {
    let transport = MockTransport::new(&[], Duration::from_millis(1), ConnectError::Refused);
    let scanner = coordinator(ScanConfig::default(), transport, StaticResolver::localhost());

    let started = Instant::now();
    let summary = scanner
        .start_scan("localhost", 1, 500)
        .unwrap()
        .finish()
        .await
        .unwrap();

    // 500 sequential timeouts would take 250s; five rounds of 1ms should not
    // come anywhere near a single timeout.
    assert_eq!(summary.probed, 500);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_stops_admission_and_ends_stream() {
    let timeout = Duration::from_millis(200);
    let transport = MockTransport::new(&[], Duration::from_millis(50), ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default()
            .with_max_concurrency(10)
            .with_timeout(timeout)
            .with_closed(),
        transport.clone(),
        StaticResolver::localhost(),
    );

    let mut handle = scanner.start_scan("localhost", 1, 1000).unwrap();
    assert!(handle.next_event().await.is_some());

    handle.canceller().cancel();
    let cancelled_at = Instant::now();
    let attempts_at_cancel = transport.attempts().len();

    while handle.next_event().await.is_some() {}
    // in-flight probes are bounded by one timeout; allow a little scheduling slack
    assert!(cancelled_at.elapsed() < timeout + Duration::from_millis(50));

    let summary = handle.finish().await.unwrap();
    assert!(summary.cancelled);
    assert!(summary.probed < 1000);
    assert_eq!(summary.probed as usize, transport.attempts().len());
    // only probes already holding a slot may start after cancellation
    assert!(transport.attempts().len() <= attempts_at_cancel + 10);
    assert!(scanner.pool().is_idle());
}

#[tokio::test]
async fn dropping_the_receiver_cancels_the_scan() {
    let transport = MockTransport::new(&[], Duration::from_millis(20), ConnectError::Refused);
    let scanner = coordinator(
        ScanConfig::default().with_max_concurrency(5).with_closed(),
        transport.clone(),
        StaticResolver::localhost(),
    );

    let handle = scanner.start_scan("localhost", 1, 5000).unwrap();
    let progress = handle.progress();
    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !scanner.pool().is_idle() || progress.completed() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(transport.attempts().len() < 5000);
}

#[tokio::test]
async fn transport_errors_do_not_affect_siblings() {
    let transport = MockTransport::new(
        &[22, 80],
        Duration::ZERO,
        ConnectError::Transport("too many open files".into()),
    );
    let scanner = coordinator(ScanConfig::default(), transport, StaticResolver::localhost());

    let mut handle = scanner.start_scan("localhost", 20, 90).unwrap();
    let mut open = Vec::new();
    while let Some(event) = handle.next_event().await {
        open.push(event.port().unwrap());
    }
    open.sort_unstable();
    assert_eq!(open, vec![22, 80]);

    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.errors, 69);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn real_loopback_listener_is_found() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let scanner = ScanCoordinator::new(ScanConfig::default().with_timeout(Duration::from_secs(2))).unwrap();
    let mut handle = scanner.start_scan("127.0.0.1", port, port).unwrap();

    match handle.next_event().await {
        Some(ScanEvent::Open { port: found, .. }) => assert_eq!(found, port),
        other => panic!("expected open event, got {:?}", other),
    }
    assert_eq!(handle.next_event().await, None);

    let summary = handle.finish().await.unwrap();
    assert_eq!(summary.address, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
}
