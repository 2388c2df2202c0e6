//! `sprig` - browse a remote hierarchy from the terminal.
//!
//! ```text
//! sprig --config sprig.toml [--scope <id>] [node-id ...]
//! ```
//!
//! Prints the root level of the hierarchy, then for every `bundle-<n>` id
//! its first page of children, and for every `asset-<n>` id the hydrated
//! asset (all assets in one batch).

use sprig_cache::{
    ActiveScope, NotificationLevel, NotificationLog, NotificationSink, TreeCache,
};
use sprig_client::{
    init_logging, render_entity, render_node, ClientConfig, ClientError, ClientResult,
    RestTreeGateway,
};
use sprig_core::{FullEntity, NodeId, NodeRef, ScopeId};
use std::sync::Arc;

struct CliArgs {
    scope: Option<ScopeId>,
    nodes: Vec<NodeId>,
}

fn parse_args() -> ClientResult<CliArgs> {
    let mut scope = None;
    let mut nodes = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            // Consumed by ClientConfig::load.
            "--config" => {
                args.next();
            }
            "--scope" => {
                let raw = args.next().unwrap_or_default();
                let id = raw.parse::<i64>().map_err(|e| {
                    ClientError::InvalidArgument(format!("--scope expects an integer, got '{raw}': {e}"))
                })?;
                scope = Some(ScopeId(id));
            }
            _ => nodes.push(NodeId::from(arg)),
        }
    }
    Ok(CliArgs { scope, nodes })
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    init_logging()?;
    let args = parse_args()?;
    let config = ClientConfig::load()?;

    let gateway = RestTreeGateway::new(&config)?;
    let scope = Arc::new(ActiveScope::new(args.scope.or(config.initial_scope())));
    let notifications = Arc::new(NotificationLog::new());
    let cache = TreeCache::new(
        gateway,
        Arc::clone(&scope),
        Arc::clone(&notifications) as Arc<dyn NotificationSink>,
        config.cache_config(),
    );
    let listener = cache.spawn_scope_listener(scope.subscribe());

    let result = run(&cache, &args.nodes).await;

    for notification in notifications.drain() {
        if notification.level == NotificationLevel::Error {
            eprintln!("error: {}", notification.message);
        }
    }
    let stats = cache.stats();
    tracing::info!(
        network_calls = stats.network_calls,
        hit_rate = stats.hit_rate(),
        failures = stats.failures,
        "done"
    );
    listener.abort();
    result
}

async fn run(cache: &TreeCache<RestTreeGateway, Arc<ActiveScope>>, nodes: &[NodeId]) -> ClientResult<()> {
    cache.fetch_root_hierarchy().await?;
    if let Some(snapshot) = cache.hierarchy() {
        println!(
            "{} bundles, {} assets",
            snapshot.total_bundles, snapshot.total_assets
        );
        for node in &snapshot.nodes {
            println!("{}", render_node(node, 0));
        }
    }

    let mut asset_ids = Vec::new();
    for node_id in nodes {
        match node_id.node_ref()? {
            NodeRef::Bundle(_) => {
                let page = cache.fetch_children(node_id).await?;
                println!();
                println!("{node_id}:");
                for child in &page.children {
                    println!("{}", render_node(child, 1));
                }
                if page.has_more {
                    println!(
                        "  ... {} more",
                        page.total_children.saturating_sub(page.children.len() as u64)
                    );
                }
            }
            NodeRef::Asset(id) => asset_ids.push(id),
        }
    }

    if !asset_ids.is_empty() {
        for asset in cache.batch_get_assets(&asset_ids).await? {
            println!();
            println!("{}", render_entity(&FullEntity::Asset(asset)));
        }
    }
    Ok(())
}
