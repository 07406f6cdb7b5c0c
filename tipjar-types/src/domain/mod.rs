//! Domain models for the tipjar platform.

pub mod donation;
pub mod exchange;
pub mod member;
pub mod month;
pub mod payment;

pub use donation::{Donation, DonationId, DonationStatus, Message};
pub use exchange::{Exchange, ExchangeId, ExchangeStatus};
pub use member::{AccountStatus, BankAccount, Member, MemberId};
pub use month::YearMonth;
pub use payment::{Payment, PaymentId, PaymentStatus, REFUND_GUARANTEE_DAYS};
