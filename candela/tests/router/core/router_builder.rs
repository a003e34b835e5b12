use std::time::Duration;

use candela::{Candela, CandelaError, MarketId};

use crate::helpers::{crypto_spec, m_list};

#[test]
fn build_requires_a_market() {
    let err = Candela::builder()
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .err()
        .expect("no markets");
    assert!(matches!(err, CandelaError::InvalidArg(_)));
}

#[test]
fn build_rejects_duplicate_market_names() {
    let err = Candela::builder()
        .with_market(m_list("binance", &[]))
        .with_market(m_list("binance", &[]))
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .err()
        .expect("duplicate");
    assert!(err.to_string().contains("binance"));
}

#[test]
fn build_rejects_zero_sizes_and_empty_table() {
    let base = || {
        Candela::builder()
            .with_market(m_list("binance", &[]))
            .asset_type(crypto_spec(&["binance"]))
    };
    assert!(base().capacity(0).build().is_err());
    assert!(base().market_capacity("binance", 0).build().is_err());
    assert!(base().kline_count(0).build().is_err());
    assert!(base().table("  ").build().is_err());
    assert!(base().build().is_ok());
}

#[test]
fn unregistered_referent_markets_are_dropped() {
    let candela = Candela::builder()
        .with_market(m_list("kraken", &[]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .asset_type(
            candela::AssetTypeSpec::new("stock", "Stock", &["nasdaq"])
                .with_timeframes(&[candela::Timeframe::D1]),
        )
        .build()
        .unwrap();

    let base = &candela.config().base;
    assert_eq!(base.asset_types.len(), 1);
    assert_eq!(
        base.asset_types[0].referent_markets,
        vec![MarketId::from("kraken")]
    );
}

#[test]
fn build_fails_when_no_asset_type_keeps_a_market() {
    let err = Candela::builder()
        .with_market(m_list("kraken", &[]))
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .err()
        .expect("nothing left");
    assert!(matches!(err, CandelaError::InvalidArg(ref m) if m.contains("crypto")));
}

#[test]
fn settings_reach_the_config() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[]))
        .with_market(m_list("kraken", &[]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .capacity(3)
        .market_capacity("kraken", 1)
        .kline_count(24)
        .market_timeout(Duration::from_millis(250))
        .request_timeout(Duration::from_secs(2))
        .table("Candles")
        .build()
        .unwrap();

    let cfg = candela.config();
    assert_eq!(cfg.capacity_for(&MarketId::from("binance")), 3);
    assert_eq!(cfg.capacity_for(&MarketId::from("kraken")), 1);
    assert_eq!(cfg.kline_count, 24);
    assert_eq!(cfg.market_timeout, Duration::from_millis(250));
    assert_eq!(cfg.request_timeout, Some(Duration::from_secs(2)));
    assert_eq!(cfg.table, "Candles");
    assert_eq!(
        candela.market_keys(),
        vec![MarketId::from("binance"), MarketId::from("kraken")]
    );
}
