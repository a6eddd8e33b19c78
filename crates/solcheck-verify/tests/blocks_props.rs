use proptest::prelude::*;
use solcheck_core::Policy;
use solcheck_verify::{extract_blocks, normalize, rebuild_blocks, Heading};

fn line() -> impl Strategy<Value = String> {
    "[a-z0-9 =+*()]{1,24}".prop_map(|s| s.trim().to_string())
}

proptest! {
    #[test]
    fn rebuilt_blocks_extract_identically(
        statement in line(), body in line(), answer in line(), check in line(),
    ) {
        prop_assume!(!statement.is_empty() && !body.is_empty());
        let text = format!(
            "EXERCICE:\n{statement}\nSOLUTION:\n{body}\nFINAL_ANSWER:\n{answer}\nCHECK:\n{check}"
        );
        let blocks = extract_blocks(&text);
        let again = extract_blocks(&rebuild_blocks(&blocks));
        for heading in Heading::ALL {
            let before = blocks.get(&heading).filter(|c| !c.is_empty());
            let after = again.get(&heading).filter(|c| !c.is_empty());
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn normalizing_twice_changes_nothing(statement in "[a-zA-Z ]{0,60}", body in "[a-z0-9 =.:\n]{0,80}") {
        let policy = Policy::default();
        let once = normalize(&statement, &body, &policy);
        let twice = normalize(&once.statement, &once.solution, &policy);
        prop_assert_eq!(&twice.statement, &once.statement);
        prop_assert_eq!(&twice.solution, &once.solution);
        prop_assert!(twice.fixes.is_empty(), "second pass applied {:?}", twice.fixes);
    }
}
