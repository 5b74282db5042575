//! Market fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use strata_risk::prelude::*;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn date() -> Date {
    Date::from_ymd(2024, 1, 2).unwrap()
}

/// Pillar date of a whole-year tenor.
pub fn years(n: i32) -> Date {
    date().add_years(n).unwrap()
}

/// USD zero curve from 1Y/5Y/10Y zero-coupon rates 0.03/0.04/0.05.
pub fn zero_market() -> MarketView {
    let zc = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
    let mut m = MarketView::new("EOD", date());
    m.add_instruments([
        Instrument::from_family(Arc::clone(&zc), "1Y", 0.03),
        Instrument::from_family(Arc::clone(&zc), "5Y", 0.04),
        Instrument::from_family(zc, "10Y", 0.05),
    ])
    .unwrap();
    m.add_discount_curve(
        "USD",
        Curve::bootstrapped("USD-ZC", Currency::USD, ["ZC-USD-1Y", "ZC-USD-5Y", "ZC-USD-10Y"]),
    )
    .unwrap();
    m.build_curves().unwrap();
    m
}

/// USD OIS from a deposit and annual swaps, a USD-LIBOR-3M spread curve over
/// it, an independent EUR zero curve, EUR/USD spot and one LIBOR fixing.
pub fn multi_market() -> MarketView {
    let dep = Arc::new(InstrumentFamily::deposit("DEP-USD", Currency::USD));
    let ois = Arc::new(InstrumentFamily::swap("OIS-USD", Currency::USD, 1));
    let basis = Arc::new(
        InstrumentFamily::spread("BASIS-USD-3M", Currency::USD).with_underlying_index("USD-LIBOR-3M"),
    );
    let zc = Arc::new(InstrumentFamily::zero_coupon("ZC-EUR", Currency::EUR));

    let mut m = MarketView::new("EOD", date());
    m.add_instruments([
        Instrument::from_family(dep, "6M", 0.052),
        Instrument::from_family(Arc::clone(&ois), "2Y", 0.048),
        Instrument::from_family(Arc::clone(&ois), "5Y", 0.044),
        Instrument::from_family(ois, "10Y", 0.042),
        Instrument::from_family(Arc::clone(&basis), "2Y", 0.0012),
        Instrument::from_family(basis, "10Y", 0.0018),
        Instrument::from_family(Arc::clone(&zc), "1Y", 0.031),
        Instrument::from_family(zc, "5Y", 0.027),
    ])
    .unwrap();
    m.add_discount_curve(
        "USD",
        Curve::bootstrapped(
            "USD-OIS",
            Currency::USD,
            ["DEP-USD-6M", "OIS-USD-2Y", "OIS-USD-5Y", "OIS-USD-10Y"],
        ),
    )
    .unwrap();
    m.add_index_curve(
        "USD-LIBOR-3M",
        Curve::spread("USD-3M", Currency::USD, "USD-OIS", ["BASIS-USD-3M-2Y", "BASIS-USD-3M-10Y"]),
    )
    .unwrap();
    m.add_discount_curve(
        "EUR",
        Curve::bootstrapped("EUR-ZC", Currency::EUR, ["ZC-EUR-1Y", "ZC-EUR-5Y"])
            .with_interpolation(InterpolationMethod::LinearZero),
    )
    .unwrap();
    m.add_spot_fx(Currency::EUR, Currency::USD, 1.09).unwrap();
    m.add_index_fixings("USD-LIBOR-3M", [(date(), 0.0535)]);
    m.build_curves().unwrap();
    m
}

/// Receive-fixed USD leg, pay-float LIBOR leg and a EUR zero bond.
pub fn multi_pricers(market: &Arc<MarketView>) -> Vec<Box<dyn Pricer>> {
    let mut fixed = CashflowPricer::new("usd-fixed", Arc::clone(market), Currency::USD, Currency::USD);
    for n in 1..=7 {
        fixed = fixed.with_fixed(years(n), 45_000.0);
    }
    fixed = fixed.with_fixed(years(7), 1_000_000.0);

    let mut float = CashflowPricer::new("usd-float", Arc::clone(market), Currency::USD, Currency::USD);
    let mut start = date();
    for _ in 0..12 {
        let end = start.add_months(3).unwrap();
        float = float.with_floating("USD-LIBOR-3M", start, end, -1_000_000.0, 0.0);
        start = end;
    }

    let eur = CashflowPricer::new("eur-zero", Arc::clone(market), Currency::EUR, Currency::USD)
        .with_fixed(years(3), 500_000.0);

    vec![Box::new(fixed), Box::new(float), Box::new(eur)]
}

pub fn value(pricer: &dyn Pricer, metric: Metric) -> f64 {
    pricer.calculate(metric).unwrap().as_scalar().unwrap()
}
