//! Market risk ladders across strategies.

mod common;

use std::sync::Arc;

use approx::{assert_relative_eq, relative_eq};
use strata_risk::prelude::*;

use common::{date, init_tracing, multi_market, multi_pricers, value, years, zero_market};

fn zero_pricer(market: &Arc<MarketView>) -> Vec<Box<dyn Pricer>> {
    vec![Box::new(
        CashflowPricer::new("zero-5y", Arc::clone(market), Currency::USD, Currency::USD)
            .with_fixed(years(5), 1_000_000.0),
    )]
}

fn quotes(market: &MarketView) -> Vec<u64> {
    market.instruments().map(|i| i.quote().to_bits()).collect()
}

#[test]
fn test_empty_pricer_list() {
    let report = RiskEngine::default()
        .calculate_market_risk(&[], None, false, Strategy::FullRebuild)
        .unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_zero_coupon_sensitivity() {
    init_tracing();
    let market = Arc::new(zero_market());
    let pricers = zero_pricer(&market);
    let engine = RiskEngine::default();

    let report = engine
        .calculate_market_risk(&pricers, None, false, Strategy::FullRebuild)
        .unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(report.rows_for_instrument("ZC-USD-1Y").next().unwrap().sensitivity, 0.0);
    assert_eq!(report.rows_for_instrument("ZC-USD-10Y").next().unwrap().sensitivity, 0.0);

    let row = report.rows_for_instrument("ZC-USD-5Y").next().unwrap();
    let t = date().year_fraction(&years(5));
    let analytic = -1_000_000.0 * t * 1.04_f64.powf(-t - 1.0);
    assert_relative_eq!(row.sensitivity, analytic, max_relative = 1e-3);
    assert_eq!(row.risk_currency, Currency::USD);
    assert_eq!(row.family, "ZC-USD");
    assert_eq!(row.specifics, "5Y");
    assert_eq!(row.quote, 0.04);
    assert_eq!(row.tenor_time, Some(5.0));
    assert_eq!(row.risk_type, RiskType::Rate);

    let trimmed = engine
        .calculate_market_risk(&pricers, None, true, Strategy::FullRebuild)
        .unwrap();
    assert_eq!(trimmed.len(), 1);
    assert_eq!(trimmed.rows[0].instrument, "ZC-USD-5Y");
}

#[test]
fn test_strategies_agree() {
    init_tracing();
    let market = Arc::new(multi_market());
    let pricers = multi_pricers(&market);
    let engine = RiskEngine::default();
    let before: Vec<f64> = pricers.iter().map(|p| value(p.as_ref(), Metric::Value)).collect();
    let quotes_before = quotes(&market);

    let full = engine
        .calculate_market_risk(&pricers, None, false, Strategy::FullRebuild)
        .unwrap();
    let in_place = engine
        .calculate_market_risk(&pricers, None, false, Strategy::InPlace)
        .unwrap();

    assert_eq!(full.len(), in_place.len());
    assert_eq!(full.len(), 2 * market.instruments().count());
    for (a, b) in full.rows.iter().zip(&in_place.rows) {
        assert_eq!(a.instrument, b.instrument);
        assert_eq!(a.risk_currency, b.risk_currency);
        assert!(
            relative_eq!(a.sensitivity, b.sensitivity, epsilon = 1e-6, max_relative = 0.01),
            "{} / {}: {} vs {}",
            a.instrument,
            a.risk_currency,
            a.sensitivity,
            b.sensitivity
        );
    }

    // in-place bumps restore every quote and every valuation
    assert_eq!(quotes(&market), quotes_before);
    let after: Vec<f64> = pricers.iter().map(|p| value(p.as_ref(), Metric::Value)).collect();
    assert_eq!(before, after);

    // basis risk only moves USD value
    assert!(full.total_for_risk_type(RiskType::RateBasis, Currency::USD).abs() > 1.0);
    assert_eq!(full.total_for_risk_type(RiskType::RateBasis, Currency::EUR), 0.0);
    assert!(full.total_for_family("ZC-EUR") < 0.0);
}

#[test]
fn test_parallel_matches_sequential() {
    let market = Arc::new(multi_market());
    let pricers = multi_pricers(&market);
    let parallel = RiskEngine::default()
        .calculate_market_risk(&pricers, None, true, Strategy::FullRebuild)
        .unwrap();
    let sequential = RiskEngine::new(RiskConfig {
        parallel: false,
        ..RiskConfig::default()
    })
    .calculate_market_risk(&pricers, None, true, Strategy::FullRebuild)
    .unwrap();
    assert_eq!(parallel, sequential);

    let names: Vec<&str> = parallel.rows.iter().map(|r| r.instrument.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn test_filter_restricts_bumped_instruments() {
    let market = Arc::new(multi_market());
    let pricers = multi_pricers(&market);
    let filter = InstrumentFilter::all().with_currencies([Currency::EUR]);
    let report = RiskEngine::default()
        .calculate_market_risk(&pricers, Some(&filter), true, Strategy::FullRebuild)
        .unwrap();
    assert!(!report.is_empty());
    assert!(report.rows.iter().all(|r| r.instrument_currency == Currency::EUR));
    assert!(report.rows.iter().all(|r| r.risk_currency == Currency::EUR));
}

#[test]
fn test_configured_strategy() {
    let market = Arc::new(zero_market());
    let pricers = zero_pricer(&market);
    let config = RiskConfig::from_toml_str("strategy = \"in_place\"\nremove_zero_sens = true").unwrap();
    let engine = RiskEngine::new(config);
    assert_eq!(engine.config().strategy, Strategy::InPlace);

    let configured = engine.calculate(&pricers, None).unwrap();
    let explicit = engine
        .calculate_market_risk(&pricers, None, true, Strategy::InPlace)
        .unwrap();
    assert_eq!(configured, explicit);
    assert_eq!(configured.len(), 1);
}

/// Fails whenever the watched instrument is quoted above `limit`.
struct Fragile {
    market: Arc<MarketView>,
    watched: &'static str,
    limit: f64,
}

impl Pricer for Fragile {
    fn name(&self) -> &str {
        "fragile"
    }

    fn market(&self) -> &Arc<MarketView> {
        &self.market
    }

    fn set_market(&mut self, market: Arc<MarketView>) {
        self.market = market;
    }

    fn calculate(&self, metric: Metric) -> RiskResult<MetricValue> {
        let quote = self.market.instrument(self.watched)?.quote();
        if quote > self.limit {
            return Err(RiskError::unsupported(self.name(), metric));
        }
        Ok(MetricValue::ByCurrency(vec![(Currency::USD, quote)]))
    }

    fn with_market(&self, market: Arc<MarketView>) -> Box<dyn Pricer> {
        Box::new(Fragile {
            market,
            watched: self.watched,
            limit: self.limit,
        })
    }
}

#[test]
fn test_failure_aborts_and_restores() {
    init_tracing();
    let market = Arc::new(zero_market());
    let pricers: Vec<Box<dyn Pricer>> = vec![Box::new(Fragile {
        market: Arc::clone(&market),
        watched: "ZC-USD-5Y",
        limit: 0.04,
    })];
    let engine = RiskEngine::default();

    for strategy in [Strategy::FullRebuild, Strategy::InPlace] {
        let err = engine
            .calculate_market_risk(&pricers, None, false, strategy)
            .unwrap_err();
        assert!(matches!(err, RiskError::Pricing { .. }));
        assert_eq!(market.instrument("ZC-USD-5Y").unwrap().quote(), 0.04);
    }

    // the other instruments alone are fine
    let filter = InstrumentFilter::all().with_names(["ZC-USD-1Y", "ZC-USD-10Y"]);
    let report = engine
        .calculate_market_risk(&pricers, Some(&filter), false, Strategy::InPlace)
        .unwrap();
    assert_eq!(report.len(), 2);
    assert!(report.rows.iter().all(|r| r.sensitivity == 0.0));
}

#[test]
fn test_pricer_without_risk_breakdown() {
    struct Scalar(Arc<MarketView>);
    impl Pricer for Scalar {
        fn name(&self) -> &str {
            "scalar"
        }
        fn market(&self) -> &Arc<MarketView> {
            &self.0
        }
        fn set_market(&mut self, market: Arc<MarketView>) {
            self.0 = market;
        }
        fn calculate(&self, _metric: Metric) -> RiskResult<MetricValue> {
            Ok(MetricValue::Scalar(1.0))
        }
        fn with_market(&self, market: Arc<MarketView>) -> Box<dyn Pricer> {
            Box::new(Scalar(market))
        }
    }

    let pricers: Vec<Box<dyn Pricer>> = vec![Box::new(Scalar(Arc::new(zero_market())))];
    let err = RiskEngine::default()
        .calculate_market_risk(&pricers, None, false, Strategy::FullRebuild)
        .unwrap_err();
    assert_eq!(err.to_string(), "pricer 'scalar' cannot calculate RiskValue");
}

#[test]
fn test_futures_convention_bumps_price_down() {
    let fut = Arc::new(InstrumentFamily::future("ED", Currency::USD));
    let mut m = MarketView::new("EOD", date());
    m.add_instrument(Instrument::from_family(fut, "3M", 95.0)).unwrap();
    m.add_discount_curve("USD", Curve::bootstrapped("USD-ED", Currency::USD, ["ED-3M"]))
        .unwrap();
    m.build_curves().unwrap();
    let market = Arc::new(m);
    let pricers: Vec<Box<dyn Pricer>> = vec![Box::new(
        CashflowPricer::new("bill", Arc::clone(&market), Currency::USD, Currency::USD)
            .with_fixed(date().add_months(3).unwrap(), 1_000_000.0),
    )];

    let report = RiskEngine::default()
        .calculate_market_risk(&pricers, None, true, Strategy::FullRebuild)
        .unwrap();
    assert_eq!(report.len(), 1);
    // a lower price is a higher rate
    assert!(report.rows[0].sensitivity < 0.0);
    assert_eq!(report.rows[0].quote, 95.0);
}

/// OIS (flat) discounting and a USD-LIBOR-3M curve bootstrapped from swaps,
/// calibrated on OIS when `dual` is set.
fn projected_market(dual: bool) -> MarketView {
    let ois = Arc::new(InstrumentFamily::flat_rate("OIS-USD", Currency::USD));
    let irs = Arc::new(InstrumentFamily::swap("IRS-USD-3M", Currency::USD, 1));
    let mut m = MarketView::new("EOD", date());
    m.add_instruments([
        Instrument::from_family(ois, "ON", 0.04),
        Instrument::from_family(Arc::clone(&irs), "1Y", 0.03),
        Instrument::from_family(Arc::clone(&irs), "2Y", 0.05),
        Instrument::from_family(irs, "3Y", 0.06),
    ])
    .unwrap();
    m.add_discount_curve("USD", Curve::flat("OIS", Currency::USD, "OIS-USD-ON"))
        .unwrap();
    let mut projection =
        Curve::bootstrapped("USD-3M", Currency::USD, ["IRS-USD-3M-1Y", "IRS-USD-3M-2Y", "IRS-USD-3M-3Y"]);
    if dual {
        projection = projection.with_prerequisites(["OIS"]);
    }
    m.add_index_curve("USD-LIBOR-3M", projection).unwrap();
    m.build_curves().unwrap();
    m
}

fn floating_leg(market: &Arc<MarketView>) -> Vec<Box<dyn Pricer>> {
    let mut leg = CashflowPricer::new("float", Arc::clone(market), Currency::USD, Currency::USD);
    let mut start = date().add_months(3).unwrap();
    for _ in 0..10 {
        let end = start.add_months(3).unwrap();
        leg = leg.with_floating("USD-LIBOR-3M", start, end, 1_000_000.0, 0.0);
        start = end;
    }
    vec![Box::new(leg)]
}

#[test]
fn test_prerequisite_bump_moves_dependent_curve() {
    let m = projected_market(true);
    let df = |market: &MarketView| {
        market
            .index_curve("USD-LIBOR-3M")
            .unwrap()
            .discount_factor_at(2.5)
            .unwrap()
    };
    let before = df(&m);

    let (bumped, _) = m.instrument("OIS-USD-ON").unwrap().bumped();
    assert_ne!(df(&m.derive([bumped]).unwrap()), before);

    let ois = m.instrument("OIS-USD-ON").unwrap();
    ois.set_quote(0.0401);
    assert_ne!(df(&m), before);
    ois.set_quote(0.04);
    assert_eq!(df(&m), before);

    let filter = InstrumentFilter::all().with_names(["OIS-USD-ON"]);
    let engine = RiskEngine::default();
    let sensitivity = |market: MarketView, strategy: Strategy| {
        let pricers = floating_leg(&Arc::new(market));
        let report = engine
            .calculate_market_risk(&pricers, Some(&filter), false, strategy)
            .unwrap();
        assert_eq!(report.len(), 1);
        report.rows[0].sensitivity
    };
    let full = sensitivity(projected_market(true), Strategy::FullRebuild);
    let in_place = sensitivity(projected_market(true), Strategy::InPlace);
    let discounting_only = sensitivity(projected_market(false), Strategy::FullRebuild);

    assert_relative_eq!(full, in_place, max_relative = 1e-6);
    assert!((full - discounting_only).abs() > 1.0, "{full} vs {discounting_only}");
}
