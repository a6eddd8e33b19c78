use proptest::prelude::*;
use solcheck_core::serde::{from_json_slice, to_canonical_json_bytes};
use solcheck_core::{CheckItem, ReportFlag, ReportKind, SolcheckError, VerifyReport};

proptest! {
    #[test]
    fn ok_is_conjunction_of_items(outcomes in proptest::collection::vec(any::<bool>(), 0..24)) {
        let mut report = VerifyReport::new(ReportKind::Mixed, "sample");
        let mut failed_once = false;
        for (idx, ok) in outcomes.iter().enumerate() {
            report.add(format!("check.{idx}"), *ok, "message");
            failed_once |= !ok;
            prop_assert_eq!(report.ok(), !failed_once);
        }
        prop_assert_eq!(report.ok(), outcomes.iter().all(|ok| *ok));
        prop_assert_eq!(report.items().len(), outcomes.len());
    }
}

#[test]
fn failing_item_is_sticky() {
    let mut report = VerifyReport::new(ReportKind::Symbolic, "sticky");
    report.add("a", false, "broken");
    report.extend(vec![CheckItem::new("b", true, "fine"), CheckItem::new("c", true, "fine")]);
    assert!(!report.ok());
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.item("b").map(|item| item.ok), Some(true));
}

#[test]
fn report_round_trips_through_canonical_json() -> Result<(), SolcheckError> {
    let mut report = VerifyReport::new(ReportKind::Numeric, "stats");
    report.add("numeric.consistency", true, "close enough");
    report.detail("r", 0.98);
    report.flag(ReportFlag::StatementPadded);
    let bytes = to_canonical_json_bytes(&report)?;
    let back: VerifyReport = from_json_slice(&bytes)?;
    assert_eq!(back, report);
    Ok(())
}

#[test]
fn inconsistent_ok_is_rejected_on_decode() {
    let json = br#"{"ok":true,"kind":"mixed","summary":"x","items":[{"name":"a","ok":false,"message":"m"}]}"#;
    let decoded: Result<VerifyReport, SolcheckError> = from_json_slice(json);
    assert!(decoded.is_err());
}
