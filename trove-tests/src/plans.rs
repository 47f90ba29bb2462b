use crate::ReadingStatus;
use indoc::indoc;
use trove::{
    Connection, ErrorKind, PlanExecutor, Session, Transaction, TransactionPlan, TransactionStep,
    TypeRegistry, Value, params,
};

const INSERT_ITEM: &str = indoc! {"
    INSERT INTO tracked_item (title, status)
    VALUES (:title, :status)
    RETURNING id, title
"};

const INSERT_PROGRESS: &str = indoc! {"
    INSERT INTO progress_log (item_id, amount)
    VALUES (:item_id, :amount)
    RETURNING item_id
"};

async fn count_items<C: Connection>(connection: &mut C, registry: &TypeRegistry, title: &str) -> i64 {
    Session::new(connection, registry)
        .fetch_scalar::<i64>(
            "SELECT COUNT(*) FROM tracked_item WHERE title = :title",
            params! { "title" => title },
        )
        .await
        .expect("Could not count the tracked items")
}

pub async fn rollback_atomicity<C: Connection>(connection: &mut C, registry: &TypeRegistry) {
    let mut plan = TransactionPlan::new();
    let item = plan.add(TransactionStep::fetch_row(
        INSERT_ITEM,
        params! { "title" => "Atomic Habits", "status" => ReadingStatus::Planned },
    ));
    plan.add(TransactionStep::execute(
        INSERT_PROGRESS,
        params! { "item_id" => item.field("id"), "amount" => 0 },
    ));
    let result;
    crate::silent_logs! {
        result = PlanExecutor::new(registry).execute(connection, plan).await;
    }
    let error = result.expect_err("A violated check constraint must fail the plan");
    assert_eq!(error.step_index(), Some(1));
    assert_eq!(error.root_kind(), ErrorKind::QueryFailed);
    assert_eq!(count_items(connection, registry, "Atomic Habits").await, 0);
}

pub async fn foreign_key<C: Connection>(connection: &mut C, registry: &TypeRegistry) {
    let mut plan = TransactionPlan::new();
    let item = plan.add(TransactionStep::fetch_row(
        INSERT_ITEM,
        params! { "title" => "Hades", "status" => ReadingStatus::ReadingNow },
    ));
    let progress = plan.add(TransactionStep::fetch_scalar::<i64>(
        INSERT_PROGRESS,
        params! { "item_id" => item.field("id"), "amount" => 3 },
    ));
    let result = PlanExecutor::new(registry)
        .execute(connection, plan)
        .await
        .expect("The plan should commit");
    let row = result
        .get(&item)
        .expect("The item step has a result")
        .as_ref()
        .expect("The insert returns a row");
    let item_id = *result.get(&progress).expect("The progress step has a result");
    assert_eq!(row.get_column("id"), Some(&Value::Int64(item_id)));
    assert_eq!(row.get_column("title"), Some(&Value::Varchar("Hades".into())));
    assert_eq!(count_items(connection, registry, "Hades").await, 1);
}

pub async fn merged_plans<C: Connection>(connection: &mut C, registry: &TypeRegistry) {
    let mut first = TransactionPlan::new();
    let item = first.add(TransactionStep::fetch_row(
        INSERT_ITEM,
        params! { "title" => "Outer Wilds", "status" => ReadingStatus::Planned },
    ));
    let mut second = TransactionPlan::new();
    let logged = second.add(TransactionStep::execute(
        INSERT_PROGRESS,
        params! { "item_id" => item.field("id"), "amount" => 22 },
    ));
    // Spreads the `id` and `title` columns of the inserted row
    let updated = second.add(TransactionStep::execute(
        "UPDATE tracked_item SET status = :status WHERE id = :id AND title = :title",
        params! { "item" => item.row(), "status" => ReadingStatus::Finished },
    ));
    first.add_plan(second);
    assert_eq!(first.len(), 3);
    assert_eq!(first.position(item.id()), Some(0));
    assert_eq!(first.position(updated.id()), Some(2));
    let result = PlanExecutor::new(registry)
        .execute(connection, first)
        .await
        .expect("The merged plan should commit");
    assert_eq!(*result.get(&logged).expect("Inserted progress"), 1);
    assert_eq!(*result.get(&updated).expect("Updated item"), 1);
    let status = Session::new(connection, registry)
        .fetch_scalar::<ReadingStatus>(
            "SELECT status FROM tracked_item WHERE title = :title",
            params! { "title" => "Outer Wilds" },
        )
        .await
        .expect("Could not read the status");
    assert_eq!(status, ReadingStatus::Finished);
}

pub async fn nested_plan<C: Connection>(connection: &mut C, registry: &TypeRegistry) {
    let executor = PlanExecutor::new(registry);
    {
        let mut transaction = connection.begin().await.expect("Could not begin");
        let mut outer = TransactionPlan::new();
        outer.add(TransactionStep::execute(
            INSERT_ITEM,
            params! { "title" => "Celeste", "status" => ReadingStatus::Finished },
        ));
        executor
            .join(&mut transaction, outer)
            .await
            .expect("The joined plan should succeed");

        let mut inner = TransactionPlan::new();
        inner.add(TransactionStep::execute(
            INSERT_ITEM,
            params! { "title" => "Celeste", "status" => ReadingStatus::Planned },
        ));
        let result;
        crate::silent_logs! {
            result = executor.nested(&mut transaction, inner).await;
        }
        let error = result.expect_err("A duplicated title must fail");
        assert_eq!(error.step_index(), Some(0));
        assert!(!transaction.is_rollback_only());
        transaction
            .commit()
            .await
            .expect("The savepoint rollback keeps the outer work");
    }
    assert_eq!(count_items(connection, registry, "Celeste").await, 1);

    {
        let mut transaction = connection.begin().await.expect("Could not begin");
        let mut plan = TransactionPlan::new();
        plan.add(TransactionStep::execute(
            INSERT_ITEM,
            params! { "title" => "Celeste", "status" => ReadingStatus::Planned },
        ));
        let result;
        crate::silent_logs! {
            result = executor.join(&mut transaction, plan).await;
        }
        assert!(result.is_err());
        assert!(transaction.is_rollback_only());
        let error = transaction
            .commit()
            .await
            .expect_err("A rollback-only transaction cannot commit");
        assert_eq!(error.kind(), ErrorKind::UnexpectedRollback);
    }
}

pub async fn unknown_handle<C: Connection>(connection: &mut C, registry: &TypeRegistry) {
    let mut other = TransactionPlan::new();
    let foreign = other.add(TransactionStep::fetch_scalar::<i64>("SELECT 1", params!()));
    let mut plan = TransactionPlan::new();
    plan.add(TransactionStep::execute(
        INSERT_PROGRESS,
        params! { "item_id" => foreign.value(), "amount" => 1 },
    ));
    let error = PlanExecutor::new(registry)
        .execute(connection, plan)
        .await
        .expect_err("A handle of another plan cannot be resolved");
    assert_eq!(error.step_index(), Some(0));
    assert_eq!(error.root_kind(), ErrorKind::UnknownHandle);

    let mut plan = TransactionPlan::new();
    let one = plan.add(TransactionStep::fetch_scalar::<i64>("SELECT 1", params!()));
    let result = PlanExecutor::new(registry)
        .execute(connection, plan)
        .await
        .expect("A constant select should commit");
    assert_eq!(*result.get(&one).expect("Selected one"), 1);
    let error = result
        .get(&foreign)
        .expect_err("The handle belongs to another plan");
    assert_eq!(error.kind(), ErrorKind::UnknownHandle);
}
