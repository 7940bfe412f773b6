mod account;
mod aggregate;
mod calendar;
mod category;
mod money;
mod payee;
mod transaction;

pub use account::*;
pub use aggregate::*;
pub use calendar::*;
pub use category::*;
pub use money::*;
pub use payee::*;
pub use transaction::*;
