use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use sumi_flow::client::{HttpClient, RetryPolicy};
use sumi_flow::config::{parse_config, SiteEntry};
use sumi_flow::dispatch::{Dispatcher, Pacing, WorkerSettings};
use sumi_flow::pool::{IdentityRotator, RequestCounter};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEAD_ENDPOINT: &str = "http://unresolvable-endpoint.invalid";

/// Fast pacing so a short test run covers many iterations
fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        timeout: Duration::from_secs(5),
        tls_verify: false,
        pacing: Pacing {
            min_sleep: Duration::from_millis(5),
            max_sleep: Duration::from_millis(20),
            rate_limit_delay: Duration::from_millis(50),
            connect_timeout_delay: Duration::from_millis(20),
            error_delay: Duration::from_millis(10),
            exhausted_retry: Duration::from_millis(100),
        },
        ..WorkerSettings::default()
    }
}

fn create_dispatcher(sites: &[SiteEntry], workers_per_site: u32) -> Dispatcher {
    let transport = HttpClient::new(
        RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(5),
        },
        Duration::from_secs(5),
    )
    .expect("Failed to build client");

    Dispatcher::new(
        sites,
        workers_per_site,
        Arc::new(transport),
        Arc::new(RequestCounter::new(0)),
        Arc::new(IdentityRotator::new(vec!["TestAgent/1.0".to_string()]).unwrap()),
        fast_settings(),
    )
}

#[tokio::test]
async fn test_dispatch_prunes_dead_endpoint_and_keeps_live_one() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let live = mock_server.uri();
    let sites = vec![SiteEntry {
        name: "mixed".to_string(),
        endpoints: vec![live.clone(), DEAD_ENDPOINT.to_string()],
    }];

    let dispatcher = create_dispatcher(&sites, 2);
    let handle = dispatcher.spawn(CancellationToken::new());

    // Wait until the dead endpoint has been hit and pruned
    let pool = dispatcher.pools()[0].clone();
    tokio::time::timeout(Duration::from_secs(10), async {
        while pool.contains(DEAD_ENDPOINT) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Dead endpoint was never pruned");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = handle.shutdown().await;

    assert_eq!(report.cancelled, 2);
    assert_eq!(pool.snapshot(), vec![live]);

    let summary = dispatcher.summary();
    let site = &summary.sites[0];
    assert_eq!(site.endpoints_removed, 1);
    assert_eq!(site.endpoints_remaining, 1);
    assert!(site.name_resolution_failures >= 1);

    // Every answered request advanced the counter exactly once
    let received = mock_server.received_requests().await.unwrap();
    assert!(!received.is_empty());
    assert_eq!(dispatcher.counter().current(), site.total_responses());
    // A request cut short by shutdown can reach the server without being counted
    assert!(site.total_responses() <= received.len() as u64);

    for request in &received {
        let tag = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "num")
            .map(|(_, value)| value.into_owned());
        assert!(tag.is_some(), "missing num tag on {}", request.url);
    }
}

#[tokio::test]
async fn test_dispatch_starts_workers_for_every_site_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let sites: Vec<SiteEntry> = (0..3)
        .map(|i| SiteEntry {
            name: format!("site-{}", i),
            endpoints: vec![format!("{}/site/{}", mock_server.uri(), i)],
        })
        .collect();

    let dispatcher = create_dispatcher(&sites, 4);
    assert_eq!(dispatcher.total_workers(), 12);

    let cancel = CancellationToken::new();
    let handle = dispatcher.spawn(cancel.clone());
    let assignments: HashSet<_> = handle.assignments().iter().cloned().collect();
    assert_eq!(assignments.len(), 12);

    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    let report = handle.wait().await;
    assert_eq!(report.cancelled, 12);

    // Each site's workers only ever requested that site's endpoint
    let received = mock_server.received_requests().await.unwrap();
    let paths: HashSet<String> = received.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        HashSet::from([
            "/site/0".to_string(),
            "/site/1".to_string(),
            "/site/2".to_string()
        ])
    );

    let summary = dispatcher.summary();
    for site in &summary.sites {
        assert!(site.total_responses() > 0, "{} saw no traffic", site.site);
        assert_eq!(site.status_counts.keys().copied().collect::<Vec<_>>(), vec![204]);
    }
}

#[tokio::test]
async fn test_dispatch_from_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = parse_config(&format!(
        r#"
[dispatch]
min-sleep-ms = 5
max-sleep-ms = 10

[output]
progress-interval-secs = 0

[[site]]
name = "local"
endpoints = ["{}/health?probe=1"]
"#,
        mock_server.uri()
    ))
    .unwrap();

    let dispatcher = Dispatcher::from_config(&config, 2).unwrap();
    let handle = dispatcher.spawn(CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = handle.shutdown().await;

    assert_eq!(report.cancelled, 2);

    let received = mock_server.received_requests().await.unwrap();
    assert!(!received.is_empty());
    for request in &received {
        let pairs: Vec<(String, String)> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("probe".to_string(), "1".to_string()));
        assert_eq!(pairs[1].0, "num");
    }
}
