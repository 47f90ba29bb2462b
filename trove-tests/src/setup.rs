use indoc::indoc;
use trove::{Executor, Query};

const STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS progress_log, tracked_item CASCADE",
    "DROP TYPE IF EXISTS edition, platform, reading_status, dynamic_dto CASCADE",
    "CREATE TYPE reading_status AS ENUM ('PLANNED', 'READING_NOW', 'FINISHED', 'GAVE_UP')",
    "CREATE TYPE platform AS (name text, release_year int4, regions text[])",
    "CREATE TYPE edition AS (status reading_status, platforms platform[], published_on date)",
    "CREATE TYPE dynamic_dto AS (type_name text, payload jsonb)",
    indoc! {"
        CREATE TABLE tracked_item (
            id bigserial PRIMARY KEY,
            title text NOT NULL UNIQUE,
            status reading_status NOT NULL,
            edition edition,
            tags text[] NOT NULL DEFAULT '{}',
            activity dynamic_dto
        )
    "},
    indoc! {"
        CREATE TABLE progress_log (
            id bigserial PRIMARY KEY,
            item_id bigint NOT NULL REFERENCES tracked_item(id),
            amount int4 NOT NULL CHECK (amount > 0)
        )
    "},
];

pub async fn setup<E: Executor>(executor: &mut E) {
    for sql in STATEMENTS {
        executor
            .execute(Query::from(*sql))
            .await
            .expect("Could not create the test schema");
    }
}
