use std::future::Future;

use super::{make_pickup_order, make_waste_upload, TestResult};
use crate::record::OrderStatus;
use crate::traits::{BlobStore, RecordStore};
use crate::StorageError;

pub(super) async fn run_order_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "orders",
            "order_linked_to_existing_upload",
            order_linked_to_existing_upload(factory).await,
        ),
        TestResult::from_result(
            "orders",
            "order_without_upload_is_allowed",
            order_without_upload_is_allowed(factory).await,
        ),
        TestResult::from_result(
            "orders",
            "unknown_upload_id_is_record_not_found",
            unknown_upload_id_is_record_not_found(factory).await,
        ),
        TestResult::from_result(
            "orders",
            "list_filters_by_status",
            list_filters_by_status(factory).await,
        ),
        TestResult::from_result(
            "orders",
            "list_without_filter_is_newest_first",
            list_without_filter_is_newest_first(factory).await,
        ),
    ]
}

async fn order_linked_to_existing_upload<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let upload = s
        .insert_waste_upload(make_waste_upload("waste-1.jpg", "PET"))
        .await
        .map_err(|e| e.to_string())?;
    let order = s
        .insert_pickup_order(make_pickup_order(Some(upload.id.clone()), OrderStatus::Pending))
        .await
        .map_err(|e| e.to_string())?;
    if order.waste_upload_id.as_deref() != Some(upload.id.as_str()) {
        return Err(format!("order lost its upload link: {:?}", order.waste_upload_id));
    }
    if order.status != OrderStatus::Pending || order.estimated_weight_grams != Some(1500.0) {
        return Err(format!("order fields differ: {:?}", order));
    }
    Ok(())
}

async fn order_without_upload_is_allowed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = s
        .insert_pickup_order(make_pickup_order(None, OrderStatus::Confirmed))
        .await
        .map_err(|e| e.to_string())?;
    if order.id.is_empty() || order.created_at.is_empty() || order.updated_at.is_empty() {
        return Err(format!("generated columns missing: {:?}", order));
    }
    Ok(())
}

async fn unknown_upload_id_is_record_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s
        .insert_pickup_order(make_pickup_order(
            Some("no-such-upload".to_string()),
            OrderStatus::Pending,
        ))
        .await
    {
        Err(StorageError::RecordNotFound { id, .. }) if id == "no-such-upload" => {}
        Err(e) => return Err(format!("expected RecordNotFound, got {}", e)),
        Ok(_) => return Err("order with dangling upload id accepted".to_string()),
    }
    let orders = s.list_pickup_orders(None).await.map_err(|e| e.to_string())?;
    if !orders.is_empty() {
        return Err("rejected order was stored".to_string());
    }
    Ok(())
}

async fn list_filters_by_status<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for status in [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Pending,
        OrderStatus::Cancelled,
    ] {
        s.insert_pickup_order(make_pickup_order(None, status))
            .await
            .map_err(|e| e.to_string())?;
    }
    let pending = s
        .list_pickup_orders(Some(OrderStatus::Pending))
        .await
        .map_err(|e| e.to_string())?;
    if pending.len() != 2 || pending.iter().any(|o| o.status != OrderStatus::Pending) {
        return Err(format!("pending filter returned {:?}", pending));
    }
    let in_progress = s
        .list_pickup_orders(Some(OrderStatus::InProgress))
        .await
        .map_err(|e| e.to_string())?;
    if !in_progress.is_empty() {
        return Err(format!("expected no in_progress orders, got {}", in_progress.len()));
    }
    Ok(())
}

async fn list_without_filter_is_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: BlobStore + RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .insert_pickup_order(make_pickup_order(None, OrderStatus::Pending))
        .await
        .map_err(|e| e.to_string())?;
    let second = s
        .insert_pickup_order(make_pickup_order(None, OrderStatus::Completed))
        .await
        .map_err(|e| e.to_string())?;
    let all = s.list_pickup_orders(None).await.map_err(|e| e.to_string())?;
    let ids: Vec<&str> = all.iter().map(|o| o.id.as_str()).collect();
    if ids != [second.id.as_str(), first.id.as_str()] {
        return Err(format!("unexpected order: {:?}", ids));
    }
    Ok(())
}
