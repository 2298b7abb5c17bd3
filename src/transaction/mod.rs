//! Transactions record money earned or spent on a date, in a category.

mod core;
mod endpoints;

pub use core::{
    Transaction, TransactionBuilder, TransactionFilter, TransactionId, TransactionPatch,
    count_transactions, create_transaction, create_transaction_table, delete_transaction,
    get_transaction, list_transactions, map_transaction_row, update_transaction,
};
pub use endpoints::{
    CreateTransactionRequest, DESCRIPTION_MAX_LENGTH, TransactionQuery, TransactionState,
    UpdateTransactionRequest,
    create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    list_transactions_endpoint, parse_description, update_transaction_endpoint,
};
