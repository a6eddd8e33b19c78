#![deny(missing_docs)]
#![doc = "Block parsing, normalization, dispatch and domain verifiers for machine-generated exercises."]

mod answer;
mod blocks;
mod directive;
mod dispatch;
mod normalize;
mod sampling;
mod structural;
mod verifiers;

pub use answer::{dict_lookup, lift_sym_error, parse_answer, parse_expr};
pub use blocks::{
    build_solution_blocks, check, extract_blocks, final_answer, rebuild_blocks, Blocks, Heading,
};
pub use directive::{classify, Directive, DirectiveKind};
pub use dispatch::{select_verifiers, verify, verify_normalized};
pub use normalize::{normalize, AppliedFix, NormalizedSolution};
pub use sampling::{sample_points, sides_agree, SampleOutcome};
pub use structural::{structural_checks, ELLIPSIS};
pub use verifiers::{Submission, Verifier};
