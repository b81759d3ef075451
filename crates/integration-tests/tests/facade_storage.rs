//! Façade tests for images, contracts, and the admin queue surface.

use bytes::Bytes;

use backroom_integration_tests::storage;
use backroom_storage::StorageFacade;

#[tokio::test]
async fn image_upload_returns_a_public_url_and_notifies_images() {
    let storage = storage();

    let url = storage
        .upload_image(Bytes::from_static(b"\x89PNG"), "beans.png")
        .await
        .expect("upload");
    assert!(url.ends_with("_beans.png"));

    let urls = storage.image_urls().await.expect("list");
    assert_eq!(urls, vec![url]);

    let notifications = storage.drain_queue("images").await.expect("drain");
    assert_eq!(notifications, vec!["Image uploaded: beans.png".to_owned()]);
}

#[tokio::test]
async fn same_filename_uploads_never_collide() {
    let storage = storage();
    storage
        .upload_image(Bytes::from_static(b"a"), "beans.png")
        .await
        .expect("upload");
    storage
        .upload_image(Bytes::from_static(b"b"), "beans.png")
        .await
        .expect("upload");

    assert_eq!(storage.image_urls().await.expect("list").len(), 2);
}

#[tokio::test]
async fn contracts_upload_and_list_with_overwrite() {
    let storage = storage();
    assert!(storage.contracts().await.expect("list").is_empty());

    storage
        .upload_contract(Bytes::from_static(b"%PDF v1"), "supply-agreement.pdf")
        .await
        .expect("upload");
    storage
        .upload_contract(Bytes::from_static(b"%PDF v2"), "supply-agreement.pdf")
        .await
        .expect("overwrite");

    assert_eq!(
        storage.contracts().await.expect("list"),
        vec!["supply-agreement.pdf".to_owned()]
    );
}

#[tokio::test]
async fn drain_queue_is_peek_and_remove_bounded_by_one_batch() {
    let storage = storage();
    for i in 0..12 {
        storage
            .enqueue_message("orders", &format!("m{i}"))
            .await
            .expect("send");
    }

    let first = storage.drain_queue("orders").await.expect("drain");
    assert_eq!(first.len(), 10);

    let second = storage.drain_queue("orders").await.expect("drain");
    assert_eq!(second.len(), 2);

    assert!(storage.drain_queue("orders").await.expect("drain").is_empty());
}
