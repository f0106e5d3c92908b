//! Transaction model and construction
//!
//! In-memory representation of notes (UTXOs), seeds (payment outputs),
//! spends, inputs, and assembled transactions, plus the builder that turns
//! them into signed wire bytes.

pub mod builder;
pub mod fees;
pub mod model;

pub use builder::{
    build_payment, build_transaction, ConstructedTransaction, PaymentOutput, TransactionParams,
};
pub use fees::{calculate_recommended_fee, estimate_transaction_size, FeeSchedule};
pub use model::{Input, Note, RawTx, Seed, Spend};
