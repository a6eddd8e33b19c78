mod common;

use common::{policy, solution, STATEMENT};
use solcheck_verify::verify;

#[test]
fn same_seed_same_report() {
    let text = solution("(1 - log(x))/x**2", "DERIVATIVE; var=x; func=log(x)/x");
    let first = verify("Dérivées", STATEMENT, &text, &policy());
    let second = verify("Dérivées", STATEMENT, &text, &policy());
    assert_eq!(first, second);
}

#[test]
fn local_search_is_seeded() {
    let check = "OPTIMIZE; var=[x,y]; func=-(x-1)**2-(y-2)**2; goal=max";
    let text = solution("{x: 1, y: 2, f_star: 0}", check);
    let mut seeded = policy();
    seeded.seed = 99;
    let a = verify("optimisation", STATEMENT, &text, &seeded);
    let b = verify("optimisation", STATEMENT, &text, &seeded);
    assert_eq!(a, b);
    assert!(a.ok());
    assert!(a.item("opt.local_check").is_some_and(|i| i.ok));
}
