//! Narrow interfaces to collaborators the core does not own.

pub mod gateway;
pub mod mailer;
pub mod notifier;
pub mod search;
pub mod signature;

pub use gateway::{GatewayError, PaymentGateway, RazorpayGateway};
pub use mailer::{LogMailer, Mailer, OutgoingEmail};
pub use notifier::{DbNotifier, NewNotification, Notifier};
pub use search::{LogIndexer, SearchIndexer};
