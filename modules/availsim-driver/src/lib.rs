//! The iteration driver (C10) and interrupt handling (C11) that tie the
//! whole simulator together.

pub mod driver;
pub mod error;
pub mod interrupt;

pub use driver::{DriverConfig, IterationDriver, IterationOutcome, PodUrlBuilder};
pub use error::{DriverError, DriverResult};
pub use interrupt::InterruptHandler;
