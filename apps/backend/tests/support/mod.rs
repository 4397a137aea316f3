pub mod app_builder;
pub mod fixtures;
pub mod pose_stub;

// Re-export only what current tests actually import
pub use app_builder::create_test_app;
pub use test_state::{build_test_state, resolve_test_db_kind};
