//! Inventory sync worker tests against mock upstreams.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use bridge_server::inventory::{InventorySyncWorker, SyncConfig};

use support::{ErpData, MockBroker, MockErp, led_panel_erp_data};

fn worker_fixture(erp: &MockErp, broker: &MockBroker, config: SyncConfig) -> InventorySyncWorker {
    InventorySyncWorker::new(Arc::new(erp.client()), Arc::new(broker.client()), config)
}

fn sync_config(batch_size: usize) -> SyncConfig {
    SyncConfig {
        interval: Duration::from_secs(300),
        batch_size,
        allowed_skus: None,
    }
}

/// Many products, small batches: every product lands in the broker,
/// including those with zero stock.
#[tokio::test]
async fn full_sync_batches_and_includes_zero_stock() {
    let mut data = ErpData::default();
    for i in 0..120 {
        data.products.push(json!({
            "id": i + 1,
            "name": format!("Component {i}"),
            "default_code": format!("COMP-{i:03}"),
            "active": true,
            "type": "product",
        }));
        // only even-numbered products have quants
        if i % 2 == 0 {
            data.quants.push(json!({
                "id": 1000 + i,
                "product_id": [i + 1, format!("Component {i}")],
                "location_id": [8, "WH/Stock"],
                "quantity": 7.0,
                "reserved_quantity": 2.0,
            }));
        }
    }
    let erp = MockErp::start(data).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    let report = worker.sync_inventory().await.unwrap();
    assert_eq!(report.processed, 120);
    assert_eq!(report.updated, 120);
    assert_eq!(report.errors, 0);
    assert_eq!(broker.entities_of_type("InventoryItem").len(), 120);

    let stocked = broker.entity("urn:ngsi-ld:InventoryItem:COMP-000").unwrap();
    assert_eq!(stocked["available"]["value"], 5.0);
    assert_eq!(stocked["reserved"]["value"], 2.0);
    assert_eq!(stocked["total"]["value"], 7.0);

    let empty = broker.entity("urn:ngsi-ld:InventoryItem:COMP-001").unwrap();
    assert_eq!(empty["available"]["value"], 0.0);
    assert_eq!(empty["total"]["value"], 0.0);

    let status = worker.status();
    assert!(status.last_sync_time.is_some());
    assert_eq!(status.last_report.unwrap().processed, 120);
}

#[tokio::test]
async fn allowlist_narrows_the_full_sync() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let config = SyncConfig {
        allowed_skus: Some(vec!["LED-STRIP-24V".into(), "PSU-150W".into()]),
        ..sync_config(50)
    };
    let worker = worker_fixture(&erp, &broker, config);

    let report = worker.sync_inventory().await.unwrap();
    assert_eq!(report.processed, 2);
    assert!(broker.entity("urn:ngsi-ld:InventoryItem:LED-STRIP-24V").is_some());
    assert!(broker.entity("urn:ngsi-ld:InventoryItem:BRACKET-STEEL-001").is_none());
}

#[tokio::test]
async fn targeted_sync_refreshes_one_sku() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    let report = worker.sync_product_inventory("BRACKET-STEEL-001").await.unwrap();
    assert_eq!(report.unwrap().updated, 1);
    assert_eq!(broker.entities_of_type("InventoryItem").len(), 1);

    assert!(worker.sync_product_inventory("NO-SUCH-SKU").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_stock_change_is_dropped() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    worker.handle_stock_change(json!({"nonsense": true})).await;
    worker.handle_stock_change(json!({"product_id": 4, "sku": ""})).await;
    worker.handle_stock_change(json!({"sku": "PSU-150W", "quantity": 3})).await;
    worker.handle_stock_change(json!("not even an object")).await;
    assert_eq!(broker.entity_count(), 0);

    worker
        .handle_stock_change(json!({"product_id": 4, "sku": "PSU-150W", "quantity": 3}))
        .await;
    assert!(broker.entity("urn:ngsi-ld:InventoryItem:PSU-150W").is_some());
}

/// The second full sync overwrites projections left by the pipeline.
#[tokio::test]
async fn sync_is_authoritative_over_projections() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    broker.state.entities.lock().insert(
        "urn:ngsi-ld:InventoryItem:PSU-150W".into(),
        json!({
            "id": "urn:ngsi-ld:InventoryItem:PSU-150W",
            "type": "InventoryItem",
            "available": {"type": "Property", "value": 1.0},
            "reserved": {"type": "Property", "value": 9.0},
        }),
    );

    worker.sync_inventory().await.unwrap();
    let item = broker.entity("urn:ngsi-ld:InventoryItem:PSU-150W").unwrap();
    assert_eq!(item["available"]["value"], 10.0);
    assert_eq!(item["reserved"]["value"], 0.0);
}

/// Cancelling the shutdown token stops the run loop promptly.
#[tokio::test]
async fn worker_stops_on_cancellation() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let worker = Arc::new(worker_fixture(&erp, &broker, sync_config(50)));

    let token = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(worker.clone().run(token.clone()));

    // let the first pass land before pulling the plug
    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker did not stop after cancellation")
        .unwrap();
    assert!(!worker.status().running);
}

/// The webhook endpoint only dispatches payloads tagged as stock changes.
#[tokio::test]
async fn webhook_dispatch_is_gated_on_the_type_discriminator() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;

    let mut config = bridge_server::core::Config::from_env();
    config.erp_url = erp.url.clone();
    config.erp_password = "secret".into();
    config.broker_url = broker.url.clone();
    config.webhook_enabled = true;
    let state = bridge_server::core::ServerState::initialize(config);
    let url = support::serve(bridge_server::api::build_app(state)).await;

    let http = reqwest::Client::new();
    let untyped = http
        .post(format!("{url}/odoo/webhook"))
        .json(&json!({"product_id": 4, "sku": "PSU-150W"}))
        .send()
        .await
        .unwrap();
    assert!(untyped.status().is_success());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(broker.entity_count(), 0);

    http.post(format!("{url}/odoo/webhook"))
        .json(&json!({"type": "stock_change", "product_id": 4, "sku": "PSU-150W"}))
        .send()
        .await
        .unwrap();
    for _ in 0..50 {
        if broker.entity("urn:ngsi-ld:InventoryItem:PSU-150W").is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("typed stock change never reached the broker");
}

/// Reserved above on-hand publishes zero available, never a negative.
#[tokio::test]
async fn oversold_stock_publishes_zero_available() {
    let mut data = led_panel_erp_data();
    data.quants[2] = json!({
        "id": 203, "product_id": [4, "Power Supply 150W"],
        "location_id": [8, "WH/Stock"],
        "quantity": 2.0, "reserved_quantity": 5.0
    });
    let erp = MockErp::start(data).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    worker.sync_inventory().await.unwrap();
    let item = broker.entity("urn:ngsi-ld:InventoryItem:PSU-150W").unwrap();
    assert_eq!(item["available"]["value"], 0.0);
    assert_eq!(item["reserved"]["value"], 5.0);

    worker.sync_product_inventory("PSU-150W").await.unwrap();
    let item = broker.entity("urn:ngsi-ld:InventoryItem:PSU-150W").unwrap();
    assert_eq!(item["available"]["value"], 0.0);
}

/// A sync that fits in one batch returns without the inter-batch pause.
#[tokio::test]
async fn single_batch_sync_has_no_trailing_pause() {
    let erp = MockErp::start(led_panel_erp_data()).await;
    let broker = MockBroker::start().await;
    let worker = worker_fixture(&erp, &broker, sync_config(50));

    let report = worker.sync_inventory().await.unwrap();
    assert_eq!(report.processed, 4);
    assert!(
        report.duration_ms < 90,
        "inter-batch pause leaked past the final batch: {}ms",
        report.duration_ms
    );
}
