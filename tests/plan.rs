mod memory;

#[cfg(test)]
mod tests {
    use crate::memory::{MemoryDataSource, rejected, row};
    use std::sync::Arc;
    use trove::{
        Connection, ErrorKind, PlanExecutor, Propagation, Query, Transaction,
        TransactionManager, TransactionPlan, TransactionStep, TypeRegistry, Value, params,
    };

    /// Inserts answer with the title length as id, other reads return three ids or
    /// echo the number of parameters.
    fn library(query: &Query) -> trove::Result<Vec<trove::RowLabeled>> {
        let sql = query.sql.as_str();
        if sql.starts_with("INSERT INTO item") {
            let Some(Value::Varchar(title)) = query.params.first() else {
                return Err(rejected(query, "title must be text"));
            };
            if title.is_empty() {
                return Err(rejected(query, "null value in column title"));
            }
            return Ok(vec![row(&[
                ("id", "int8", Value::Int64(title.len() as i64)),
                ("title", "text", Value::Varchar(title.clone())),
            ])]);
        }
        if sql.starts_with("INSERT INTO progress") {
            return match query.params.first() {
                Some(Value::Int64(..)) => Ok(vec![row(&[])]),
                _ => Err(rejected(query, "item_id must be int8")),
            };
        }
        if sql.starts_with("SELECT id FROM item") {
            return Ok((1..=3)
                .map(|i| row(&[("id", "int8", Value::Int64(i))]))
                .collect());
        }
        if sql.starts_with("SELECT nothing") {
            return Ok(Vec::new());
        }
        Ok(vec![row(&[("echo", "int8", Value::Int64(query.params.len() as i64))])])
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::builder().build().unwrap()
    }

    #[tokio::test]
    async fn plan_steps_resolve_in_order() {
        let source = MemoryDataSource::new(library);
        let registry = registry();
        let mut plan = TransactionPlan::new();
        let item = plan.add(TransactionStep::fetch_row(
            "INSERT INTO item (title) VALUES (:title) RETURNING id, title",
            params! { "title" => "Hyperion" },
        ));
        let logged = plan.add(TransactionStep::execute(
            "INSERT INTO progress (item_id, pages) VALUES (:item_id, :pages)",
            params! { "item_id" => item.field("id"), "pages" => 20 },
        ));
        let ids = plan.add(TransactionStep::fetch_scalar_column::<i64>(
            "SELECT id FROM item",
            params!(),
        ));
        let echoed = plan.add(TransactionStep::fetch_scalar::<i64>(
            "SELECT :ids",
            params! { "ids" => ids.first_column() },
        ));
        let mut connection = source.connection();
        let mut result = PlanExecutor::new(&registry)
            .execute(&mut connection, plan)
            .await
            .expect("The plan should commit");
        assert_eq!(result.len(), 4);
        let row = result.take(&item).unwrap().expect("The insert returns a row");
        assert_eq!(row.get_column("id"), Some(&Value::Int64(8)));
        assert_eq!(*result.get(&logged).unwrap(), 1);
        assert_eq!(*result.get(&ids).unwrap(), [1, 2, 3]);
        // The array reference expands into one parameter per element
        assert_eq!(*result.get(&echoed).unwrap(), 3);
        assert_eq!(
            result.take(&item).unwrap_err().kind(),
            ErrorKind::UnknownHandle
        );
        assert_eq!(source.events(), ["begin", "commit"]);
        assert_eq!(
            source.committed(),
            [
                "INSERT INTO item (title) VALUES ($1) RETURNING id, title",
                "INSERT INTO progress (item_id, pages) VALUES ($1, $2)",
                "SELECT id FROM item",
                "SELECT ARRAY[$1, $2, $3]",
            ]
        );
    }

    #[tokio::test]
    async fn failed_step_rolls_back() {
        let source = MemoryDataSource::new(library);
        let registry = registry();
        let mut plan = TransactionPlan::new();
        plan.add(TransactionStep::execute(
            "INSERT INTO item (title) VALUES (:title)",
            params! { "title" => "Ilium" },
        ));
        plan.add(TransactionStep::execute(
            "INSERT INTO item (title) VALUES (:title)",
            params! { "title" => "" },
        ));
        plan.add(TransactionStep::execute(
            "INSERT INTO item (title) VALUES (:title)",
            params! { "title" => "Olympos" },
        ));
        let error = PlanExecutor::new(&registry)
            .execute(&mut source.connection(), plan)
            .await
            .expect_err("An empty title is rejected");
        assert_eq!(error.step_index(), Some(1));
        assert_eq!(error.kind(), ErrorKind::StepFailed);
        assert_eq!(error.root_kind(), ErrorKind::QueryFailed);
        assert_eq!(source.events(), ["begin", "rollback"]);
        assert!(source.committed().is_empty());
    }

    #[tokio::test]
    async fn dependency_errors() {
        let source = MemoryDataSource::new(library);
        let registry = registry();
        let executor = PlanExecutor::new(&registry);
        let mut connection = source.connection();

        let mut plan = TransactionPlan::new();
        let nothing = plan.add(TransactionStep::fetch_row("SELECT nothing", params!()));
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => nothing.field("id") },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.step_index(), Some(1));
        assert_eq!(error.root_kind(), ErrorKind::NullSourceResult);

        let mut plan = TransactionPlan::new();
        let ids = plan.add(TransactionStep::fetch_rows("SELECT id FROM item", params!()));
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => ids.field("title") },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::ColumnNotFound);

        let mut plan = TransactionPlan::new();
        let ids = plan.add(TransactionStep::fetch_rows("SELECT id FROM item", params!()));
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => ids.field_at(Some("id"), 3) },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::RowIndexOutOfBounds);

        let mut plan = TransactionPlan::new();
        let count = plan.add(TransactionStep::fetch_scalar::<i64>("SELECT 1", params!()));
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => count.first_column() },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::ResultNotList);

        let mut plan = TransactionPlan::new();
        let count = plan.add(TransactionStep::fetch_scalar::<i64>("SELECT 1", params!()));
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => count.field("echo") },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::ResultNotMapList);

        // A merged plan can hold a reference to a step that runs later
        let mut later = TransactionPlan::new();
        let last = later.add(TransactionStep::fetch_scalar::<i64>("SELECT 1", params!()));
        let mut plan = TransactionPlan::new();
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => last.value() },
        ));
        plan.add_plan(later);
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.step_index(), Some(0));
        assert_eq!(error.root_kind(), ErrorKind::DependencyOnFutureStep);

        let mut plan = TransactionPlan::new();
        plan.add(TransactionStep::execute(
            "SELECT :v",
            params! { "v" => nothing.value() },
        ));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::UnknownHandle);

        let mut plan = TransactionPlan::new();
        plan.add(TransactionStep::execute("SELECT :missing", params!()));
        let error = executor.execute(&mut connection, plan).await.unwrap_err();
        assert_eq!(error.root_kind(), ErrorKind::MissingParameter);

        assert!(source.committed().is_empty());
        assert!(source.events().iter().all(|v| *v != "commit"));
    }

    #[tokio::test]
    async fn transforms_and_row_spread() {
        let source = MemoryDataSource::new(|query: &Query| {
            if query.sql.starts_with("SELECT id, title") {
                return Ok(vec![row(&[
                    ("id", "int8", Value::Int64(4)),
                    ("title", "text", Value::Varchar("Anathem".into())),
                ])]);
            }
            Ok(vec![row(&[(
                "params",
                "text",
                Value::Varchar(trove::format_params(&query.params)),
            )])])
        });
        let registry = registry();
        let mut plan = TransactionPlan::new();
        let book = plan.add(TransactionStep::fetch_row("SELECT id, title", params!()));
        let doubled = plan.add(TransactionStep::fetch_scalar::<String>(
            "SELECT :id",
            params! { "id" => book.field("id").map_as(|v: i64| v * 2) },
        ));
        let spread = plan.add(TransactionStep::fetch_scalar::<String>(
            "SELECT :id, :title",
            params! {
                "book" => book.row().map(|v| Ok(match v {
                    Value::Varchar(v) => Value::Varchar(v.to_uppercase()),
                    v => v,
                })),
                "id" => 9i64,
            },
        ));
        let result = PlanExecutor::new(&registry)
            .execute(&mut source.connection(), plan)
            .await
            .unwrap();
        assert_eq!(result.get(&doubled).unwrap(), "$1 = 8");
        // Explicit parameters win over the spread columns
        assert_eq!(result.get(&spread).unwrap(), "$1 = 9, $2 = 'ANATHEM'");
    }

    #[tokio::test]
    async fn propagation() {
        let source = MemoryDataSource::new(library);
        let manager = TransactionManager::new(source.clone(), Arc::new(registry()));
        let insert = |title: &str| {
            let mut plan = TransactionPlan::new();
            plan.add(TransactionStep::execute(
                "INSERT INTO item (title) VALUES (:title)",
                params! { "title" => title },
            ));
            plan
        };

        // Required: a failure dooms the caller's transaction
        let mut connection = source.connection();
        let mut transaction = connection.begin().await.unwrap();
        manager
            .execute_within(&mut transaction, insert("Ubik"), Propagation::Required)
            .await
            .unwrap();
        manager
            .execute_within(&mut transaction, insert(""), Propagation::Required)
            .await
            .unwrap_err();
        assert!(transaction.is_rollback_only());
        assert_eq!(
            transaction.commit().await.unwrap_err().kind(),
            ErrorKind::UnexpectedRollback
        );
        assert!(source.committed().is_empty());

        // RequiresNew: survives the caller's rollback
        let mut transaction = connection.begin().await.unwrap();
        manager
            .execute_within(&mut transaction, insert("Valis"), Propagation::RequiresNew)
            .await
            .unwrap();
        transaction.rollback().await.unwrap();
        assert_eq!(source.committed(), ["INSERT INTO item (title) VALUES ($1)"]);

        // Nested: a failure only undoes its own work
        let mut transaction = connection.begin().await.unwrap();
        manager
            .execute_within(&mut transaction, insert("Solaris"), Propagation::Nested)
            .await
            .unwrap();
        let mut failing = insert("Eden");
        failing.add(TransactionStep::execute(
            "INSERT INTO item (title) VALUES (:title)",
            params! { "title" => "" },
        ));
        manager
            .execute_within(&mut transaction, failing, Propagation::Nested)
            .await
            .unwrap_err();
        assert!(!transaction.is_rollback_only());
        transaction.commit().await.unwrap();
        assert_eq!(source.committed().len(), 2);
        assert_eq!(
            source.events(),
            [
                "begin",
                "rollback",
                "begin",
                "acquire",
                "begin",
                "commit",
                "rollback",
                "begin",
                "savepoint",
                "release",
                "savepoint",
                "rollback to savepoint",
                "commit",
            ]
        );

        // Standalone plans get their own connection
        manager.execute(insert("Roadside Picnic")).await.unwrap();
        assert_eq!(source.committed().len(), 3);
    }
}
