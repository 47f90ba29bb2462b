
#[cfg(test)]
mod tests {
    use super::init::init;
    use std::sync::Mutex;
    use trove::{CatalogArray, CatalogEnum, CatalogSource, DataSource, Executor, Query};
    use trove_postgres::{PostgresConnection, PostgresDataSource};
    use trove_tests::{execute_tests, init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();

        let (url, _container) = init().await;
        let error_msg = format!("Could not connect to `{url}`");
        let connection = PostgresConnection::connect(url.clone())
            .await
            .expect(&error_msg);
        execute_tests(connection).await;

        // The schema created by the shared cases is still there
        let source = PostgresDataSource::new(format!(
            "{url}{}sslmode=disable",
            if url.contains('?') { "&" } else { "?" }
        ));
        let mut connection = source.acquire().await.expect(&error_msg);
        let catalog = connection
            .load_catalog(&["public".into()])
            .await
            .expect("Could not read the catalog");
        assert!(catalog.enums.contains(&CatalogEnum {
            name: "reading_status".into(),
            labels: vec![
                "PLANNED".into(),
                "READING_NOW".into(),
                "FINISHED".into(),
                "GAVE_UP".into(),
            ],
        }));
        let platform = catalog
            .composites
            .iter()
            .find(|v| v.name == "platform")
            .expect("Missing the platform composite");
        assert_eq!(
            platform.attributes,
            [
                ("name".to_string(), "text".to_string()),
                ("release_year".into(), "int4".into()),
                ("regions".into(), "_text".into()),
            ]
        );
        assert!(catalog.arrays.contains(&CatalogArray {
            name: "_platform".into(),
            element: "platform".into(),
        }));
        assert!(
            !catalog.composites.iter().any(|v| v.name == "tracked_item"),
            "Table row types are not standalone composites"
        );
        let rows = connection
            .fetch_all(Query::from("SELECT 1 AS one"))
            .await
            .expect("Could not run a plain select");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                PostgresConnection::connect("mysql://some_url")
                    .await
                    .is_err()
            );
        }
    }
}
