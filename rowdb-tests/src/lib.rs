//! Reference test suite exercising `rowdb-core`'s pipeline against
//! `rowdb-mem`, the in-memory reference backend every scenario here runs
//! against.

mod auto_key;
mod basic;
mod partial_update;
mod schema_evolution;
mod secondary_scan;

pub(crate) fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}
