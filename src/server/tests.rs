//! Server Tests
//!
//! Validates peer picking against the ring, agreement between nodes with
//! identical membership, the RPC handler's status mapping and the server
//! lifecycle rules.

#[cfg(test)]
mod tests {
    use crate::error::CacheError;
    use crate::namespace::{loader_fn, Namespaces};
    use crate::peers::PeerPicker;
    use crate::registry::MemoryRegistry;
    use crate::server::protocol::{GetRequest, NodeStatsResponse, ENDPOINT_RPC_GET, ENDPOINT_STATS};
    use crate::server::CacheServer;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_server(addr: &str) -> Arc<CacheServer> {
        let registry = Arc::new(MemoryRegistry::new());
        let namespaces = Namespaces::new();
        namespaces.create(
            "music",
            2 << 10,
            Arc::new(loader_fn(|key: String| async move {
                match key.as_str() {
                    "Leslie" => Ok("沉默是金".as_bytes().to_vec()),
                    "Lam" => Ok("分分钟需要你".as_bytes().to_vec()),
                    "Sam" => Ok("浪子心声".as_bytes().to_vec()),
                    other => Err(anyhow::anyhow!("{} not exist", other)),
                }
            })),
        );
        CacheServer::new(addr, registry, namespaces, Duration::from_secs(10))
            .expect("valid test address")
    }

    fn rpc_request(namespace: &str, key: &str) -> Request<Body> {
        let payload = GetRequest {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        Request::builder()
            .method("POST")
            .uri(ENDPOINT_RPC_GET)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap()
    }

    // ============================================================
    // PEER PICKING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_pick_peer_splits_local_and_remote() {
        let server = test_server("127.0.0.1:7001");
        server.set_peers(["127.0.0.1:7001", "127.0.0.1:7002"]);

        let mut local = 0;
        let mut remote = 0;
        for i in 0..200 {
            match server.pick_peer(&format!("key-{}", i)) {
                None => local += 1,
                Some(_) => remote += 1,
            }
        }

        // Two nodes at 50 virtual points each; both sides of the split must
        // be populated.
        assert!(local > 0, "no key routed locally");
        assert!(remote > 0, "no key routed remotely");
    }

    #[tokio::test]
    async fn test_pick_peer_with_no_membership_is_local() {
        let server = test_server("127.0.0.1:7001");
        assert!(server.pick_peer("anything").is_none());
    }

    #[tokio::test]
    async fn test_identical_membership_agrees_on_ownership() {
        let peers = ["127.0.0.1:7001", "127.0.0.1:7002"];
        let first = test_server(peers[0]);
        let second = test_server(peers[1]);
        first.set_peers(peers);
        second.set_peers(peers);

        for i in 0..100 {
            let key = format!("key-{}", i);
            let first_local = first.pick_peer(&key).is_none();
            let second_local = second.pick_peer(&key).is_none();
            assert!(
                first_local != second_local,
                "key {} claimed by {} nodes",
                key,
                if first_local { 2 } else { 0 }
            );
        }
    }

    #[tokio::test]
    #[should_panic(expected = "invalid peer address")]
    async fn test_set_peers_rejects_malformed_address() {
        let server = test_server("127.0.0.1:7001");
        server.set_peers(["127.0.0.1:7001", "nonsense"]);
    }

    #[tokio::test]
    #[should_panic(expected = "register_peers called more than once")]
    async fn test_register_peers_twice_is_fatal() {
        let server = test_server("127.0.0.1:7001");
        let namespace = server.namespaces().lookup("music").unwrap();

        let picker: Arc<dyn PeerPicker> = server.clone();
        namespace.register_peers(picker.clone());
        namespace.register_peers(picker);
    }

    #[test]
    fn test_new_rejects_malformed_address() {
        let registry = Arc::new(MemoryRegistry::new());
        let namespaces = Namespaces::new();
        let err = CacheServer::new("localhost:abc", registry, namespaces, Duration::from_secs(10))
            .err()
            .expect("must reject malformed address");
        assert!(matches!(err, CacheError::InvalidPeerAddress(_)));
    }

    // ============================================================
    // RPC HANDLER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_rpc_get_returns_value_bytes() {
        let server = test_server("127.0.0.1:7001");
        let app = server.router();

        let response = app.oneshot(rpc_request("music", "Leslie")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), "沉默是金".as_bytes());
    }

    #[tokio::test]
    async fn test_rpc_get_empty_key_is_bad_request() {
        let server = test_server("127.0.0.1:7001");
        let app = server.router();

        let response = app.oneshot(rpc_request("music", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rpc_get_unknown_namespace_is_not_found() {
        let server = test_server("127.0.0.1:7001");
        let app = server.router();

        let response = app.oneshot(rpc_request("ghosts", "Leslie")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rpc_get_backing_failure_is_internal() {
        let server = test_server("127.0.0.1:7001");
        let app = server.router();

        let response = app.oneshot(rpc_request("music", "unknow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_stats_reports_namespaces() {
        let server = test_server("127.0.0.1:7001");
        let namespace = server.namespaces().lookup("music").unwrap();
        namespace.get("Sam", None).await.unwrap();

        let app = server.router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri(ENDPOINT_STATS)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let stats: NodeStatsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats.addr, "127.0.0.1:7001");
        assert_eq!(stats.namespaces.len(), 1);
        assert_eq!(stats.namespaces[0].name, "music");
        assert_eq!(stats.namespaces[0].entries, 1);
    }

    // ============================================================
    // LIFECYCLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_start_twice_reports_already_running() {
        let server = test_server("127.0.0.1:7391");

        let running = {
            let server = server.clone();
            tokio::spawn(async move { server.start().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let err = server.start().await.expect_err("second start must fail");
        assert_eq!(
            err.downcast_ref::<CacheError>(),
            Some(&CacheError::AlreadyRunning)
        );

        server.stop();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let server = test_server("127.0.0.1:7001");
        server.stop();
        server.stop();
    }
}
