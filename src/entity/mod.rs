pub mod audit_logs;
pub mod commissions;
pub mod deliveries;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod payouts;
pub mod products;
pub mod sellers;
pub mod users;
pub mod wallet_transactions;

pub use audit_logs::Entity as AuditLogs;
pub use commissions::Entity as Commissions;
pub use deliveries::Entity as Deliveries;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use payouts::Entity as Payouts;
pub use products::Entity as Products;
pub use sellers::Entity as Sellers;
pub use users::Entity as Users;
pub use wallet_transactions::Entity as WalletTransactions;
