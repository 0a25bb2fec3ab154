//! SQLite persistence layer for the chart catalog.
//!
//! Provides schema creation, folder/chart writes, and query APIs backed by
//! SQLite (via rusqlite with bundled feature). Every function takes a plain
//! `&Connection`; callers decide how the connection is shared.

pub mod operations;
pub mod queries;
pub mod schema;

pub use operations::{
    OperationError, delete_chart, delete_chart_by_hash, delete_folder, delete_folder_tree,
    update_folder_modified, upsert_chart, upsert_folder,
};
pub use queries::{
    CatalogStats, catalog_stats, escape_like, find_chart, find_charts_by_content_hash,
    find_charts_by_parent, folder_parent, folder_path, get_folder_by_hash, get_folder_by_path,
    list_children, search_charts,
};
pub use schema::{SchemaError, open_database, open_memory};
