//! Paginated queries against a live server.

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use tablekit_core::QueryOptions;
    use tablekit_model::{AttributeValue, Item};

    use crate::{cleanup_table, create_test_table, dynamodb_client, table_client};

    fn entry(pk: &str, i: usize) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), AttributeValue::from(pk));
        item.insert("sk".to_owned(), AttributeValue::from(format!("item#{i:02}")));
        item.insert("email".to_owned(), AttributeValue::from(format!("u{i:02}@x.io")));
        item
    }

    fn probe(pk: &str, sk: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), AttributeValue::from(pk));
        item.insert("sk".to_owned(), AttributeValue::from(sk));
        item
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_follow_cursors_in_all_mode() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "query-all").await;
        let table = table_client(&client, &table_name);
        table
            .batch_write((0..5).map(|i| entry("p", i)).collect())
            .await
            .unwrap();

        let mut sizes = Vec::new();
        let result = table
            .query_with(
                &probe("p", ""),
                QueryOptions::builder().prefix(true).all(true).limit(2).build(),
                |page| sizes.push(page.count),
            )
            .await
            .unwrap();
        assert_eq!(result.count, 5);
        assert!(result.cursor.is_none());
        assert_eq!(sizes.iter().sum::<usize>(), 5);

        let first = table
            .query(
                &probe("p", ""),
                QueryOptions::builder().prefix(true).limit(2).build(),
            )
            .await
            .unwrap();
        assert_eq!(first.count, 2);
        assert!(first.cursor.is_some());

        cleanup_table(&client, &table_name).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_through_local_index() {
        let client = dynamodb_client();
        let table_name = create_test_table(&client, "query-index").await;
        let table = table_client(&client, &table_name);
        table
            .batch_write((0..12).map(|i| entry("p", i)).collect())
            .await
            .unwrap();

        let mut by_email = Item::new();
        by_email.insert("pk".to_owned(), AttributeValue::from("p"));
        by_email.insert("email".to_owned(), AttributeValue::from("u1"));
        let pages: Vec<_> = table
            .pages(
                &by_email,
                QueryOptions::builder().prefix(true).all(true).build(),
            )
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let emails: Vec<_> = pages
            .iter()
            .flat_map(|page| page.items.iter())
            .filter_map(|item| item.get("email").and_then(AttributeValue::as_s))
            .collect();
        assert_eq!(emails, vec!["u10@x.io", "u11@x.io"]);

        cleanup_table(&client, &table_name).await;
    }
}
