//! Façade tests for carts, orders, and their queue notifications.

use backroom_core::OrderStatus;
use backroom_integration_tests::{cart_item_draft, order_draft, storage, user_draft};
use backroom_storage::{StorageError, StorageFacade};

#[tokio::test]
async fn cart_add_get_clear_round_trip() {
    let storage = storage();
    storage
        .create_user(user_draft("thandi@example.com"), "pw")
        .await
        .expect("create user");
    let user_id = storage.list_users().await.expect("list")[0].id.to_string();

    storage
        .add_to_cart(&user_id, cart_item_draft("Espresso Beans"))
        .await
        .expect("add");
    storage
        .add_to_cart(&user_id, cart_item_draft("Stoneware Mug"))
        .await
        .expect("add");

    let items = storage.cart_items(&user_id).await.expect("items");
    let names: Vec<&str> = items.iter().map(|i| i.product_name.as_str()).collect();
    assert!(names.contains(&"Espresso Beans"));
    assert!(names.contains(&"Stoneware Mug"));

    // Remove is scoped to the owning user: a different user deletes nothing.
    let first_id = items[0].id;
    storage
        .remove_cart_item("424242", first_id)
        .await
        .expect("foreign remove is a no-op");
    assert_eq!(storage.cart_items(&user_id).await.expect("items").len(), 2);

    storage
        .remove_cart_item(&user_id, first_id)
        .await
        .expect("remove");
    assert_eq!(storage.cart_items(&user_id).await.expect("items").len(), 1);

    storage.clear_cart(&user_id).await.expect("clear");
    assert!(storage.cart_items(&user_id).await.expect("items").is_empty());
}

#[tokio::test]
async fn create_order_fails_for_unknown_or_invalid_owners() {
    let storage = storage();

    let err = storage
        .create_order(order_draft("not-a-number"))
        .await
        .expect_err("unparseable owner");
    assert!(matches!(err, StorageError::InvalidInput(_)));

    let err = storage
        .create_order(order_draft("999"))
        .await
        .expect_err("nonexistent owner");
    assert!(matches!(err, StorageError::InvalidInput(_)));

    // Neither failure enqueued a notification.
    assert!(storage.drain_queue("orders").await.expect("drain").is_empty());
}

#[tokio::test]
async fn create_order_assigns_an_id_and_notifies_orders_exactly_once() {
    let storage = storage();
    storage
        .create_user(user_draft("thandi@example.com"), "pw")
        .await
        .expect("create user");
    let user_id = storage.list_users().await.expect("list")[0].id.to_string();

    let order = storage
        .create_order(order_draft(&user_id))
        .await
        .expect("create order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.user_id.to_string(), user_id);

    let notifications = storage.drain_queue("orders").await.expect("drain");
    assert_eq!(notifications, vec![format!("Order placed: {}", order.id)]);
}

#[tokio::test]
async fn order_listings_are_most_recent_first_and_join_the_owner() {
    let storage = storage();
    storage
        .create_user(user_draft("thandi@example.com"), "pw")
        .await
        .expect("create user");
    let user_id = storage.list_users().await.expect("list")[0].id.to_string();

    let first = storage.create_order(order_draft(&user_id)).await.expect("order");
    let second = storage.create_order(order_draft(&user_id)).await.expect("order");

    let mine = storage.orders_for_user(&user_id).await.expect("list");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second.id);
    assert_eq!(mine[1].id, first.id);

    let all = storage.all_orders().await.expect("all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].owner.email.as_str(), "thandi@example.com");
}

#[tokio::test]
async fn status_updates_notify_only_when_the_order_exists() {
    let storage = storage();
    storage
        .create_user(user_draft("thandi@example.com"), "pw")
        .await
        .expect("create user");
    let user_id = storage.list_users().await.expect("list")[0].id.to_string();
    let order = storage.create_order(order_draft(&user_id)).await.expect("order");
    storage.drain_queue("orders").await.expect("drain creation message");

    storage
        .update_order_status(order.id, OrderStatus::Shipped)
        .await
        .expect("update");

    let refreshed = storage.orders_for_user(&user_id).await.expect("list");
    assert_eq!(refreshed[0].status, OrderStatus::Shipped);

    let notifications = storage.drain_queue("orders").await.expect("drain");
    assert_eq!(
        notifications,
        vec![format!("Order status updated: {} to SHIPPED", order.id)]
    );

    // Unknown order: silent no-op, no notification.
    storage
        .update_order_status(backroom_core::OrderId::new(404), OrderStatus::Cancelled)
        .await
        .expect("no-op");
    assert!(storage.drain_queue("orders").await.expect("drain").is_empty());
}
