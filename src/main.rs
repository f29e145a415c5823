use std::sync::Arc;
use std::time::Duration;

use meshcache::config::Config;
use meshcache::namespace::{loader_fn, Namespaces};
use meshcache::peers::PeerPicker;
use meshcache::registry::{HttpRegistry, RegistryService};
use meshcache::server::handlers::api_router;
use meshcache::server::CacheServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!(
            "Usage: {} --bind <addr:port> [--peers <addr:port,...>] [--api <addr:port>] [--serve-registry]",
            args[0]
        );
        eprintln!("Example: {} --bind 127.0.0.1:7001 --serve-registry", args[0]);
        eprintln!(
            "Example: {} --bind 127.0.0.1:7002 --peers 127.0.0.1:7001,127.0.0.1:7002 --api 127.0.0.1:9999",
            args[0]
        );
        std::process::exit(1);
    }

    let mut bind_addr: Option<String> = None;
    let mut peer_addrs: Vec<String> = vec![];
    let mut api_addr: Option<String> = None;
    let mut serve_registry = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--peers" => {
                peer_addrs = args[i + 1].split(',').map(str::to_string).collect();
                i += 2;
            }
            "--api" => {
                api_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--serve-registry" => {
                serve_registry = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let bind_addr = bind_addr.expect("--bind is required");
    if peer_addrs.is_empty() {
        peer_addrs = vec![bind_addr.clone()];
    }

    let config = Config::from_env();
    tracing::info!("starting node on {}", bind_addr);
    tracing::info!("fleet members: {:?}", peer_addrs);

    // 1. Service registry. One node per fleet hosts it; everyone else only
    //    needs the endpoint.
    if serve_registry {
        let registry_addr: std::net::SocketAddr = config.registry_endpoint.parse()?;
        let service = RegistryService::new();
        tokio::spawn(async move {
            if let Err(e) = service.serve(registry_addr).await {
                tracing::error!("registry service failed: {}", e);
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let registry = Arc::new(HttpRegistry::new(&config.registry_endpoint, config.lease_ttl));

    // 2. A sample namespace over a deliberately slow backing table, so a
    //    running fleet can be poked by hand.
    let namespaces = Namespaces::new();
    let albums = namespaces.create(
        "albums",
        config.cache_bytes,
        Arc::new(loader_fn(|key: String| async move {
            tracing::info!("slow source lookup for {}", key);
            tokio::time::sleep(Duration::from_millis(200)).await;
            match key.as_str() {
                "Leslie" => Ok("沉默是金".as_bytes().to_vec()),
                "Lam" => Ok("分分钟需要你".as_bytes().to_vec()),
                "Sam" => Ok("浪子心声".as_bytes().to_vec()),
                other => Err(anyhow::anyhow!("{} not exist", other)),
            }
        })),
    );

    // 3. The cache server: membership, peer picking, internode RPC.
    let server = CacheServer::new(&bind_addr, registry, namespaces, config.rpc_timeout)?;
    server.set_peers(&peer_addrs);

    let picker: Arc<dyn PeerPicker> = server.clone();
    albums.register_peers(picker);

    // 4. Optional client-facing API server, for callers outside the fleet.
    if let Some(api_addr) = api_addr {
        let api_addr: std::net::SocketAddr = api_addr.parse()?;
        let app = api_router(albums.clone());
        tokio::spawn(async move {
            tracing::info!("api server listening on {}", api_addr);
            match tokio::net::TcpListener::bind(api_addr).await {
                Ok(listener) => {
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::error!("api server failed: {}", e);
                    }
                }
                Err(e) => tracing::error!("api server could not bind {}: {}", api_addr, e),
            }
        });
    }

    // 5. Stop cleanly on ctrl-c: revoke the registry lease and drain the
    //    listener before exiting.
    {
        let server = server.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
                server.stop();
            }
        });
    }

    server.start().await
}
