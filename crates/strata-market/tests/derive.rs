//! Copy-on-write derivation and dependency resolution.

use std::sync::Arc;

use proptest::prelude::*;
use strata_market::prelude::*;

fn date() -> Date {
    Date::from_ymd(2024, 1, 2).unwrap()
}

/// OIS (flat) <- USD-3M (spread) ; EUR (bootstrapped, independent).
fn market() -> MarketView {
    let ois = Arc::new(InstrumentFamily::flat_rate("OIS-USD", Currency::USD));
    let basis = Arc::new(InstrumentFamily::spread("BASIS-3M", Currency::USD));
    let eur = Arc::new(InstrumentFamily::swap("IRS-EUR", Currency::EUR, 1));
    let eur_dep = Arc::new(InstrumentFamily::deposit("DEP-EUR", Currency::EUR));

    let mut m = MarketView::new("EOD", date());
    m.add_instruments([
        Instrument::from_family(ois, "ON", 0.05),
        Instrument::from_family(Arc::clone(&basis), "2Y", 0.001),
        Instrument::from_family(basis, "10Y", 0.002),
        Instrument::from_family(eur_dep, "6M", 0.031),
        Instrument::from_family(Arc::clone(&eur), "2Y", 0.029),
        Instrument::from_family(eur, "5Y", 0.027),
    ])
    .unwrap();
    m.add_discount_curve("USD", Curve::flat("OIS", Currency::USD, "OIS-USD-ON"))
        .unwrap();
    m.add_index_curve(
        "USD-LIBOR-3M",
        Curve::spread("USD-3M", Currency::USD, "OIS", ["BASIS-3M-2Y", "BASIS-3M-10Y"]),
    )
    .unwrap();
    m.add_discount_curve(
        "EUR",
        Curve::bootstrapped("EUR", Currency::EUR, ["DEP-EUR-6M", "IRS-EUR-2Y", "IRS-EUR-5Y"]),
    )
    .unwrap();
    m.build_curves().unwrap();
    m
}

const TIMES: [f64; 6] = [0.25, 1.0, 2.5, 5.0, 7.5, 12.0];

fn dfs(m: &MarketView, curve: &str) -> Vec<u64> {
    let output = m.curve_output(curve).unwrap();
    TIMES
        .iter()
        .map(|&t| output.discount_factor_at(t).unwrap().to_bits())
        .collect()
}

fn quotes(m: &MarketView) -> Vec<u64> {
    m.instruments().map(|i| i.quote().to_bits()).collect()
}

#[test]
fn test_all_curves_built() {
    let m = market();
    assert!(m.curves().all(Curve::is_built));
    assert_eq!(m.index_curve_ids()["USD-LIBOR-3M"], "USD-3M");
}

#[test]
fn test_derive_is_pure() {
    let m = market();
    let before: Vec<_> = ["OIS", "USD-3M", "EUR"].iter().map(|c| dfs(&m, c)).collect();
    let quotes_before = quotes(&m);

    let replacements = vec![
        m.instrument("OIS-USD-ON").unwrap().with_quote(0.06),
        m.instrument("IRS-EUR-5Y").unwrap().with_quote(0.03),
    ];
    let derived = m.derive(replacements).unwrap();

    let after: Vec<_> = ["OIS", "USD-3M", "EUR"].iter().map(|c| dfs(&m, c)).collect();
    assert_eq!(before, after);
    assert_eq!(quotes_before, quotes(&m));
    assert!(m.curves().all(Curve::is_built));
    assert_ne!(dfs(&derived, "EUR"), dfs(&m, "EUR"));
}

#[test]
fn test_selective_rebuild() {
    let m = market();
    let replacement = m.instrument("BASIS-3M-10Y").unwrap().with_quote(0.004);
    let derived = m.derive([replacement]).unwrap();

    // EUR and OIS do not depend on the basis quote
    assert_eq!(dfs(&derived, "EUR"), dfs(&m, "EUR"));
    assert_eq!(dfs(&derived, "OIS"), dfs(&m, "OIS"));
    assert!(derived
        .curve("EUR")
        .unwrap()
        .output()
        .unwrap()
        .ptr_eq(m.curve("EUR").unwrap().output().unwrap()));
    assert_ne!(dfs(&derived, "USD-3M"), dfs(&m, "USD-3M"));
}

#[test]
fn test_transitive_dependency_is_rebuilt() {
    let m = market();
    assert!(m.curve_instruments("USD-3M").unwrap().contains("OIS-USD-ON"));
    assert_eq!(
        m.curve_dependencies("USD-3M").unwrap().into_iter().collect::<Vec<_>>(),
        vec!["OIS".to_string()]
    );

    let replacement = m.instrument("OIS-USD-ON").unwrap().with_quote(0.045);
    let derived = m.derive([replacement]).unwrap();
    assert_ne!(dfs(&derived, "USD-3M"), dfs(&m, "USD-3M"));
    assert_eq!(dfs(&derived, "EUR"), dfs(&m, "EUR"));

    let base = derived.discount_curve("USD").unwrap().discount_factor_at(2.0).unwrap();
    let projected = derived.index_curve("USD-LIBOR-3M").unwrap().discount_factor_at(2.0).unwrap();
    assert!((projected - base * (-0.001_f64 * 2.0).exp()).abs() < 1e-15);
}

#[test]
fn test_out_of_range_tenor_fails_build() {
    let zc = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
    for tenor in ["999999999Y", "4000000000D", "3000000000M"] {
        let mut m = MarketView::new("EOD", date());
        m.add_instruments([
            Instrument::from_family(Arc::clone(&zc), "1Y", 0.03),
            Instrument::from_family(Arc::clone(&zc), tenor, 0.04),
        ])
        .unwrap();
        let name = format!("ZC-USD-{tenor}");
        m.add_discount_curve("USD", Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-1Y", name.as_str()]))
            .unwrap();
        let err = m.build_curves().unwrap_err();
        assert!(matches!(err, MarketError::InvalidDate { .. }), "{tenor}: {err}");
        assert!(!m.curve("USD").unwrap().is_built());
    }
}

#[test]
fn test_missing_prerequisite_is_corrupted_market() {
    let mut m = market();
    m.add_curve(Curve::spread("GBP-3M", Currency::GBP, "SONIA", ["BASIS-3M-2Y"]))
        .unwrap();
    let err = m.build_curves().unwrap_err();
    assert!(err.is_consistency());
    assert!(err.to_string().starts_with("Corrupted market"));
}

#[test]
fn test_cycle_is_corrupted_market() {
    let mut m = market();
    m.add_curve(
        Curve::bootstrapped("A", Currency::USD, ["IRS-EUR-2Y"]).with_prerequisites(["B"]),
    )
    .unwrap();
    m.add_curve(
        Curve::bootstrapped("B", Currency::USD, ["IRS-EUR-5Y"]).with_prerequisites(["A"]),
    )
    .unwrap();
    assert!(m.build_curves().unwrap_err().is_consistency());
}

#[test]
fn test_rebuild_if_needed_builds_prerequisites_only() {
    let ois = Arc::new(InstrumentFamily::flat_rate("OIS-USD", Currency::USD));
    let basis = Arc::new(InstrumentFamily::spread("BASIS-3M", Currency::USD));
    let zc = Arc::new(InstrumentFamily::zero_coupon("ZC-GBP", Currency::GBP));
    let mut m = MarketView::new("EOD", date());
    m.add_instruments([
        Instrument::from_family(ois, "ON", 0.05),
        Instrument::from_family(basis, "2Y", 0.001),
        Instrument::from_family(zc, "1Y", 0.04),
    ])
    .unwrap();
    m.add_curve(Curve::flat("OIS", Currency::USD, "OIS-USD-ON")).unwrap();
    m.add_curve(Curve::spread("USD-3M", Currency::USD, "OIS", ["BASIS-3M-2Y"]))
        .unwrap();
    m.add_curve(Curve::bootstrapped("GBP", Currency::GBP, ["ZC-GBP-1Y"]))
        .unwrap();

    m.rebuild_if_needed("USD-3M").unwrap();
    assert!(m.curve("OIS").unwrap().is_built());
    assert!(m.curve("USD-3M").unwrap().is_built());
    assert!(!m.curve("GBP").unwrap().is_built());
}

#[test]
fn test_in_place_quote_is_seen_by_built_curves() {
    let m = market();
    let before = dfs(&m, "EUR");
    let instrument = m.instrument("IRS-EUR-5Y").unwrap();
    instrument.set_quote(0.028);
    assert_ne!(dfs(&m, "EUR"), before);
    instrument.set_quote(0.027);
    assert_eq!(dfs(&m, "EUR"), before);
}

proptest! {
    #[test]
    fn prop_derive_never_mutates_base(shift in -0.01f64..0.01, pick in 0usize..6) {
        let m = market();
        let names: Vec<String> = m.instruments().map(|i| i.name().to_string()).collect();
        let target = m.instrument(&names[pick]).unwrap();
        let before: Vec<_> = ["OIS", "USD-3M", "EUR"].iter().map(|c| dfs(&m, c)).collect();
        let quotes_before = quotes(&m);

        let _derived = m.derive([target.with_quote(target.quote() + shift)]).unwrap();

        let after: Vec<_> = ["OIS", "USD-3M", "EUR"].iter().map(|c| dfs(&m, c)).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(quotes_before, quotes(&m));
    }
}
