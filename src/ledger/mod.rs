pub mod policy;
pub mod store;

pub use policy::{decide_withdraw_status, WithdrawStatus};
pub use store::{LedgerEntry, LedgerError, LedgerStore};
