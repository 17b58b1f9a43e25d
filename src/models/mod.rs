mod commit;
mod conflict;
mod host;
mod ledger;
mod outcome;
mod preview;

pub use commit::*;
pub use conflict::*;
pub use host::*;
pub use ledger::*;
pub use outcome::*;
pub use preview::*;
