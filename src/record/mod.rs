//! Records of money spent or earned.
//!
//! This module contains:
//! - The `Record` model and `NewRecord` for validating form input
//! - Database functions for saving, listing and deleting records
//! - The records page and the endpoints for adding and deleting records

mod add_endpoint;
mod core;
mod delete_endpoint;
mod index_page;

pub use add_endpoint::{AddRecordForm, add_record_endpoint};
pub use core::{
    Amount, DEFAULT_LIST_LIMIT, NewRecord, Record, RecordType, count_records, create_record,
    create_record_table, delete_record, get_record, list_records,
};
pub use delete_endpoint::delete_record_endpoint;
pub use index_page::{RecordPageState, get_index_page};
