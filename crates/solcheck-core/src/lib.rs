#![deny(missing_docs)]
#![doc = "Core report, policy, error and RNG types shared by the solcheck crates."]

pub mod errors;
/// Tolerance and sampling policy.
pub mod policy;
/// Verification report data carrier.
pub mod report;
pub mod rng;
pub mod serde;

pub use errors::{ErrorInfo, SolcheckError};
pub use policy::Policy;
pub use report::{CheckItem, ReportFlag, ReportKind, VerifyReport};
pub use rng::{derive_substream_seed, RngHandle};
