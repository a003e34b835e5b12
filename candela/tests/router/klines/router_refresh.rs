use std::sync::Arc;

use candela::{AssetId, AssetTypeSpec, Candela, CandelaError, SyncReport, Timeframe};
use candela_mock::InMemoryStore;

use crate::helpers::{CRYPTO, MockMarket, TABLE, at, crypto_spec, dt, h1_row, owned};

async fn setup(spec: AssetTypeSpec) -> (Candela, Arc<MockMarket>, InMemoryStore) {
    let binance = Arc::new(MockMarket {
        name: "binance",
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(binance.clone())
        .asset_type(spec)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("ETH", "binance")])
        .await;
    store
        .seed_rows(TABLE, vec![h1_row("BTC", at(11)), h1_row("BTC", at(12))])
        .await;
    (candela, binance, store)
}

#[tokio::test]
async fn refresh_touches_only_assets_with_stored_rows() {
    let (candela, binance, store) = setup(crypto_spec(&["binance"])).await;

    let round = candela.open_round().await.unwrap();
    let report = round
        .refresh(&store, &store, &[Timeframe::H1], dt(2024, 1, 1, 13, 30, 0))
        .await
        .unwrap();

    assert_eq!(report.planned, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.written, 1);

    let calls = binance.kline_calls.lock().await;
    let tasks = &calls[0][&candela::AssetTypeId::from(CRYPTO)];
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].asset.asset_id, AssetId::from("crypto-BTC"));

    let rows = store.rows(TABLE).await;
    assert!(rows.iter().any(|r| r.kline.open_time == at(13)));
    assert!(rows.iter().all(|r| r.asset_id == AssetId::from("crypto-BTC")));
}

#[tokio::test]
async fn refresh_due_fetches_timeframes_closing_at_the_instant() {
    let spec = AssetTypeSpec::new(CRYPTO, "Crypto", &["binance"])
        .with_timeframes(&[Timeframe::H1, Timeframe::D1]);
    let (candela, binance, store) = setup(spec).await;

    let round = candela.open_round().await.unwrap();
    let report = round.refresh_due(&store, &store, at(14)).await.unwrap();

    assert_eq!(report.planned, 1, "only 1h is due and stored");
    assert_eq!(report.written, 1);
    let calls = binance.kline_calls.lock().await;
    let slots: Vec<Timeframe> = calls[0][&candela::AssetTypeId::from(CRYPTO)][0]
        .slots
        .keys()
        .copied()
        .collect();
    assert_eq!(slots, vec![Timeframe::H1]);
}

#[tokio::test]
async fn nothing_due_is_a_no_op() {
    let (candela, binance, store) = setup(crypto_spec(&["binance"])).await;

    let round = candela.open_round().await.unwrap();
    let report = round
        .refresh_due(&store, &store, dt(2024, 1, 1, 14, 30, 0))
        .await
        .unwrap();

    assert_eq!(report, SyncReport::default());
    assert!(binance.kline_calls.lock().await.is_empty());
}

#[tokio::test]
async fn untracked_timeframe_is_rejected() {
    let (candela, _binance, store) = setup(crypto_spec(&["binance"])).await;

    let round = candela.open_round().await.unwrap();
    let err = round
        .refresh(&store, &store, &[Timeframe::D1], at(0))
        .await
        .unwrap_err();
    assert_eq!(err, CandelaError::unsupported_timeframe("1d"));

    let empty = round.refresh(&store, &store, &[], at(0)).await.unwrap();
    assert_eq!(empty, SyncReport::default());
}
