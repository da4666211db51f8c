//! Income and expense transactions: the data model, persistence and
//! aggregation, plus the route handlers for managing them.

mod aggregation;
mod core;
mod endpoints;
mod events;

pub use aggregation::{
    MonthCashflow, MonthGroup, Summary, TransactionFilter, cashflow_by_month, filter_transactions,
    group_by_month, summarize,
};
pub use core::{
    Category, Transaction, TransactionKind, TransactionValues, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, get_transactions_for_user,
    update_transaction,
};
pub use endpoints::{
    TransactionState, create_transaction_endpoint, delete_transaction_endpoint, get_cashflow,
    get_grouped_transactions, get_transactions, update_transaction_endpoint,
};
pub use events::poll_transaction_events;
