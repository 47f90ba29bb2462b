mod library;
mod plans;
mod round_trip;
mod setup;

pub use library::*;
use log::LevelFilter;
use plans::{foreign_key, merged_plans, nested_plan, rollback_atomicity, unknown_handle};
use round_trip::round_trip;
use setup::setup;
use std::env;
use trove::{CatalogSource, Connection, TypeRegistry};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Creates the test schema, loads the registry from the live catalog and runs every case.
pub async fn execute_tests<C: Connection + CatalogSource>(mut connection: C) {
    setup(&mut connection).await;
    let registry = TypeRegistry::builder()
        .register_enum::<ReadingStatus>()
        .register_composite::<Platform>()
        .register_composite::<Edition>()
        .register_dynamic::<Activity>()
        .load(&mut connection)
        .await
        .expect("Could not load the type registry");
    round_trip(&mut connection, &registry).await;
    rollback_atomicity(&mut connection, &registry).await;
    foreign_key(&mut connection, &registry).await;
    merged_plans(&mut connection, &registry).await;
    nested_plan(&mut connection, &registry).await;
    unknown_handle(&mut connection, &registry).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
