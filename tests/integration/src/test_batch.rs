//! Bulk writes and deletes against a live server.

#[cfg(test)]
mod tests {
    use tablekit_core::QueryOptions;
    use tablekit_model::{AttributeValue, Item};

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_client};

    fn entry(pk: &str, i: usize) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), AttributeValue::from(pk));
        item.insert("sk".to_owned(), AttributeValue::from(format!("item#{i:03}")));
        item
    }

    fn partition(pk: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), AttributeValue::from(pk));
        item.insert("sk".to_owned(), AttributeValue::from(""));
        item
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_write_and_delete_more_than_one_group() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "batch").await;
        let table = table_client(&client, &table_name);

        let written = table
            .batch_write((0..52).map(|i| entry("p", i)).collect())
            .await
            .unwrap();
        assert_eq!(written.len(), 52);
        let stamps: Vec<_> = written.iter().filter_map(|i| i.get("__ts")).collect();
        assert_eq!(stamps.len(), 52);
        assert!(stamps.windows(2).all(|w| w[0] == w[1]));

        let all = QueryOptions::builder().prefix(true).all(true).build();
        let found = table.query(&partition("p"), all.clone()).await.unwrap();
        assert_eq!(found.count, 52);

        let deleted = table
            .batch_delete(
                &partition("p"),
                QueryOptions::builder().prefix(true).limit(20).build(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.len(), 52);

        let left = table.query(&partition("p"), all).await.unwrap();
        assert_eq!(left.count, 0);

        cleanup_table(&client, &table_name).await;
    }
}
