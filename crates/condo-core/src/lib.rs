//! # condo-core: Foundational Types for the Condominium Ledger
//!
//! Domain primitives and pure computations shared by the API service and
//! the command-line client. Nothing in this crate performs I/O.
//!
//! ## Modules
//!
//! - [`house`]: house numbers and user roles.
//! - [`movement`]: ledger movement identifiers, kinds and row layouts.
//! - [`temporal`]: the condominium's local clock and billing periods.
//! - [`delinquency`]: balance and traffic-light assessment.
//! - [`settings`]: typed `CONFIGURACION` values with defaults.
//! - [`resident`]: user accounts and contact details.
//! - [`record`], [`cell`]: loose sheet cell parsing.

pub mod cell;
pub mod delinquency;
pub mod error;
pub mod house;
pub mod movement;
pub mod record;
pub mod resident;
pub mod settings;
pub mod temporal;

pub use delinquency::{assess, AlertSnapshot, Assessment, TrafficLight};
pub use error::ValidationError;
pub use house::{HouseId, Role};
pub use movement::{CashFlow, Movement, MovementId, MovementKind, NewMovement, PaymentMethod};
pub use record::Record;
pub use resident::{Contact, UserAccount};
pub use settings::{SettingValue, Settings};
pub use temporal::{BillingPeriod, LocalClock};
