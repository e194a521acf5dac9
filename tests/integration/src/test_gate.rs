//! Single-item operations and the optimistic write gate against a live server.

#[cfg(test)]
mod tests {
    use tablekit_core::{DeleteOptions, PutOptions, TableError, UpdateOptions};
    use tablekit_model::{AttributeValue, Item};

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_client};

    fn user(pk: &str, sk: &str, email: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), AttributeValue::from(pk));
        item.insert("sk".to_owned(), AttributeValue::from(sk));
        item.insert("email".to_owned(), AttributeValue::from(email));
        item
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_get_and_refuse_duplicate_create() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "gate-put").await;
        let table = table_client(&client, &table_name);

        let written = table
            .put(user("u1", "profile", "a@x.io"), PutOptions::default())
            .await
            .unwrap();
        assert!(written.contains_key("__ts"));

        let fetched = table.get(&user("u1", "profile", "a@x.io")).await.unwrap();
        assert_eq!(fetched, Some(written));

        let err = table
            .put(user("u1", "profile", "b@x.io"), PutOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "expected conflict, got {err:?}");

        table
            .put(
                user("u1", "profile", "b@x.io"),
                PutOptions::builder().overwrite(true).build(),
            )
            .await
            .unwrap();

        cleanup_table(&client, &table_name).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires running server"]
    async fn test_should_reject_stale_writer() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "gate-race").await;
        let table = table_client(&client, &table_name);
        let key = user("u1", "profile", "a@x.io");
        table.put(key.clone(), PutOptions::default()).await.unwrap();

        let racer = table.clone();
        let racing_key = key.clone();
        let err = table
            .update(
                &key,
                UpdateOptions::transform(move |mut item| {
                    tokio::task::block_in_place(|| {
                        tokio::runtime::Handle::current().block_on(
                            racer.update(
                                &racing_key,
                                UpdateOptions::expression("SET #owner = :owner")
                                    .name("#owner", "owner")
                                    .value(":owner", AttributeValue::from("racer")),
                            ),
                        )
                    })
                    .unwrap();
                    item.insert("owner".to_owned(), AttributeValue::from("slow"));
                    item
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::ConcurrencyConflict { .. }));

        let stored = table.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.get("owner"), Some(&AttributeValue::from("racer")));

        cleanup_table(&client, &table_name).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_update_by_expression_and_delete() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "gate-update").await;
        let table = table_client(&client, &table_name);
        let key = user("u1", "profile", "a@x.io");

        let err = table
            .update(&key, UpdateOptions::expression("SET #v = :one"))
            .await
            .unwrap_err();
        assert!(matches!(err, TableError::NotFound { .. }));

        let created = table
            .update(
                &key,
                UpdateOptions::expression("SET #v = :one")
                    .name("#v", "visits")
                    .value(":one", AttributeValue::number(1))
                    .upsert(true),
            )
            .await
            .unwrap();
        assert_eq!(created.get("visits"), Some(&AttributeValue::number(1)));

        let deleted = table.delete(&created, DeleteOptions::default()).await.unwrap();
        assert!(deleted.is_some());
        assert_eq!(table.get(&key).await.unwrap(), None);

        cleanup_table(&client, &table_name).await;
    }
}
