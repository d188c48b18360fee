//! Failure injection tests for the proxy.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use elastic_proxy::config::ForwardStrategy;

mod common;

use common::{
    client, proxy_config, raw_get, start_mock_backend, start_proxy, unused_addr, BROKEN_PREFIX, SLOW_DELAY,
    STRATEGIES,
};

#[tokio::test]
async fn test_backend_down_yields_bad_gateway() {
    for strategy in STRATEGIES {
        let url = format!("http://{}/", unused_addr());
        let proxy = start_proxy(proxy_config(&url, strategy)).await;

        let res = client()
            .get(proxy.url("/_cluster/health"))
            .send()
            .await
            .expect("Proxy unreachable");

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY, "{strategy}");
        assert!(res.bytes().await.unwrap().is_empty(), "{strategy}: error body leaked");

        proxy.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_response_header_timeout() {
    for strategy in STRATEGIES {
        let backend = start_mock_backend().await;
        let mut config = proxy_config(&backend.url(), strategy);
        config.timeouts.response_header_secs = 1;
        let proxy = start_proxy(config).await;

        let start = Instant::now();
        let res = client().get(proxy.url("/cloudstats/slow")).send().await.unwrap();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY, "{strategy}");
        assert!(start.elapsed() < SLOW_DELAY, "{strategy}: timeout did not fire");
        assert_eq!(backend.calls(), 1);

        proxy.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_backend_errors_are_relayed_not_masked() {
    for strategy in STRATEGIES {
        let backend = start_mock_backend().await;
        let proxy = start_proxy(proxy_config(&backend.url(), strategy)).await;
        let client = client();

        for code in [404u16, 429, 500, 503] {
            let res = client
                .get(proxy.url(&format!("/cloudstats/status/{code}")))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status().as_u16(), code, "{strategy}");
        }

        proxy.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_client_disconnect_releases_backend_stream() {
    for strategy in STRATEGIES {
        let backend = start_mock_backend().await;
        let proxy = start_proxy(proxy_config(&backend.url(), strategy)).await;

        let mut res = client().get(proxy.url("/cloudstats/stream")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{strategy}");
        let first = res.chunk().await.unwrap().expect("no first chunk");
        assert!(first.starts_with(b"{\"chunk\":0}"), "{strategy}");

        // Hang up mid-body; the proxy must stop pulling from the backend.
        drop(res);
        let deadline = Instant::now() + Duration::from_secs(3);
        while backend.streams_abandoned() == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(backend.streams_abandoned(), 1, "{strategy}: backend stream kept running");

        proxy.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_backend_reset_mid_body_aborts_client_body() {
    for strategy in STRATEGIES {
        let backend = start_mock_backend().await;
        let proxy = start_proxy(proxy_config(&backend.url(), strategy)).await;

        let mut res = client().get(proxy.url("/cloudstats/broken")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{strategy}");

        // The client must see an aborted body, never a clean but short one.
        let mut received = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), res.chunk()).await {
                Ok(Ok(Some(chunk))) => received.extend_from_slice(&chunk),
                Ok(Ok(None)) => panic!("{strategy}: truncated body ended cleanly"),
                Ok(Err(_)) => break,
                Err(_) => panic!("{strategy}: client body never finished"),
            }
        }
        assert!(BROKEN_PREFIX.starts_with(&received), "{strategy}: unexpected bytes");
        assert_eq!(backend.calls(), 1);

        proxy.shutdown.trigger();
    }
}

#[tokio::test]
async fn test_dot_segments_are_refused_by_manual_strategy() {
    let backend = start_mock_backend().await;
    let proxy = start_proxy(proxy_config(&backend.url(), ForwardStrategy::Manual)).await;

    let response = raw_get(proxy.addr, "/cloudstats/../_cat/indices").await;
    assert!(response.starts_with("HTTP/1.1 502"), "unexpected response: {response}");
    assert_eq!(backend.calls(), 0);

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let backend = start_mock_backend().await;
    let proxy = start_proxy(proxy_config(&backend.url(), ForwardStrategy::Delegate)).await;

    let url = proxy.url("/_nodes");
    let res = client().get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    proxy.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), proxy.handle)
        .await
        .expect("server did not stop after shutdown");
    assert!(result.unwrap().is_ok());

    assert!(client().get(&url).send().await.is_err());
}
