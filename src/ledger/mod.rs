//! Quantity ledgers mutated inside a caller-owned transaction.

pub mod stock;
pub mod wallet;

pub use stock::{ReservedLine, order_total, reserve_stock, restore_stock};
pub use wallet::{credit_wallet, debit_wallet};
