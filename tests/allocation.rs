//! Concurrency properties of the allocation engine: no code unit is ever bound to two orders, no matter how many
//! admins hammer the approve button at once.
use std::collections::HashSet;

use codeshop_engine::{
    db_types::{NewOrder, OrderStatusType},
    OrderFlowApi,
    ShopStore,
    ShopStoreError,
};
use futures_util::future::join_all;

use crate::support::prepare_env::{prepare_test_env, random_db_path, seed_product};

mod support;

const STOCK: [&str; 5] = ["K-1", "K-2", "K-3", "K-4", "K-5"];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_never_double_spend() {
    let db = prepare_test_env(&random_db_path()).await;
    let product = seed_product(&db, "epic", 100, &STOCK).await;
    let api = OrderFlowApi::new(db.clone());

    // Four orders of 2 units each against 5 unsold units: at most two approvals can succeed.
    let mut order_ids = Vec::new();
    for i in 0..4 {
        let order = api.create_order(NewOrder::new("epic", 2, "BTC", format!("tx-race-{i}").as_str())).await.unwrap();
        order_ids.push(order.order_id);
    }

    let attempts = order_ids.iter().map(|oid| {
        let db = db.clone();
        async move { OrderFlowApi::new(db).approve_order(oid).await }
    });
    let results = join_all(attempts).await;

    let mut bound = Vec::new();
    let mut successes = 0;
    for result in &results {
        match result {
            Ok(outcome) => {
                assert!(!outcome.already);
                assert_eq!(outcome.codes.len(), 2);
                bound.extend(outcome.codes.iter().cloned());
                successes += 1;
            },
            Err(ShopStoreError::InsufficientStock { requested: 2, .. }) => {},
            Err(ShopStoreError::StoreConflict) => {},
            Err(e) => panic!("Unexpected allocation failure: {e}"),
        }
    }

    // No unit was handed to two orders, and no more units were consumed than ever existed.
    let unique: HashSet<&String> = bound.iter().collect();
    assert_eq!(unique.len(), bound.len());
    assert!(bound.len() <= STOCK.len());
    assert!((1..=2).contains(&successes), "expected 1 or 2 successful approvals, got {successes}");

    let remaining = db.available_count(product.id).await.unwrap();
    assert_eq!(remaining, (STOCK.len() - bound.len()) as i64);

    // Every failed order is still Pending with zero codes bound.
    for (result, order_id) in results.iter().zip(&order_ids) {
        if result.is_err() {
            let summary = api.order_summary(order_id).await.unwrap();
            assert_eq!(summary.order.status, OrderStatusType::Pending);
            assert!(summary.codes.is_empty());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_of_one_order_allocate_once() {
    let db = prepare_test_env(&random_db_path()).await;
    let product = seed_product(&db, "epic", 100, &STOCK).await;
    let api = OrderFlowApi::new(db.clone());

    let order = api.create_order(NewOrder::new("epic", 2, "BTC", "tx-replay-race")).await.unwrap();

    let attempts = (0..4).map(|_| {
        let db = db.clone();
        let order_id = order.order_id.clone();
        async move { OrderFlowApi::new(db).approve_order(&order_id).await }
    });
    let results = join_all(attempts).await;

    let mut fresh = 0;
    let mut code_sets: Vec<Vec<String>> = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => {
                if !outcome.already {
                    fresh += 1;
                }
                code_sets.push(outcome.codes);
            },
            // A contender that lost every retry is acceptable; it just reports the conflict to the admin.
            Err(ShopStoreError::StoreConflict) => {},
            Err(e) => panic!("Unexpected approval failure: {e}"),
        }
    }

    // Exactly one contender performed the allocation; every other success was a replay of the same codes.
    assert_eq!(fresh, 1);
    assert!(!code_sets.is_empty());
    for codes in &code_sets {
        assert_eq!(codes, &code_sets[0]);
    }

    assert_eq!(db.available_count(product.id).await.unwrap(), (STOCK.len() - 2) as i64);
    let summary = api.order_summary(&order.order_id).await.unwrap();
    assert_eq!(summary.order.status, OrderStatusType::Approved);
    assert_eq!(summary.codes.len(), 2);
}
