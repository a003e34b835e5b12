use std::sync::Arc;

use candela::{AssetId, Candela, CandelaError, KlineRow, TimeWindow, Timeframe};
use candela_mock::InMemoryStore;

use crate::helpers::{MockMarket, TABLE, at, crypto, crypto_spec, h1_row, owned};

fn times(rows: &[KlineRow], symbol: &str) -> Vec<chrono::DateTime<chrono::Utc>> {
    let id = AssetId::from(format!("crypto-{symbol}"));
    rows.iter()
        .filter(|r| r.asset_id == id)
        .map(|r| r.kline.open_time)
        .collect()
}

fn market(name: &'static str) -> Arc<MockMarket> {
    Arc::new(MockMarket {
        name,
        ..Default::default()
    })
}

#[tokio::test]
async fn catchup_fills_the_window_then_is_idempotent() {
    let binance = market("binance");
    let candela = Candela::builder()
        .with_market(binance.clone())
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("ETH", "binance")])
        .await;

    let round = candela.open_round().await.unwrap();
    let first = round.catchup(&store, &store, false, at(13)).await.unwrap();
    assert_eq!(first.planned, 2);
    assert_eq!(first.fetched, 8);
    assert_eq!(first.written, 8);
    assert!(first.stale_assets.is_empty());
    assert_eq!(first.pruned, 0);

    let rows = store.rows(TABLE).await;
    assert_eq!(times(&rows, "BTC"), vec![at(10), at(11), at(12), at(13)]);

    let second = round.catchup(&store, &store, false, at(13)).await.unwrap();
    assert_eq!(second.planned, 0);
    assert_eq!(second.written, 0);
    assert_eq!(store.rows(TABLE).await.len(), 8);
    assert_eq!(binance.kline_calls.lock().await.len(), 1, "nothing left to fetch");
}

#[tokio::test]
async fn only_the_missing_range_is_requested() {
    let binance = market("binance");
    let candela = Candela::builder()
        .with_market(binance.clone())
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;
    store
        .seed_rows(TABLE, vec![h1_row("BTC", at(10)), h1_row("BTC", at(11)), h1_row("BTC", at(12))])
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.catchup(&store, &store, false, at(13)).await.unwrap();

    let calls = binance.kline_calls.lock().await.clone();
    assert_eq!(calls.len(), 1);
    let slot = &calls[0][&crypto()][0].slots[&Timeframe::H1];
    assert_eq!(slot.window, TimeWindow::new(at(12), at(13)).unwrap());

    assert_eq!(report.planned, 1);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.written, 1, "the shared bound is already stored");
    assert_eq!(
        times(&store.rows(TABLE).await, "BTC"),
        vec![at(10), at(11), at(12), at(13)]
    );
}

#[tokio::test]
async fn window_rolls_forward_and_old_rows_are_pruned() {
    let candela = Candela::builder()
        .with_market(market("binance"))
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    round.catchup(&store, &store, false, at(13)).await.unwrap();
    let report = round.catchup(&store, &store, false, at(15)).await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.written, 2);
    assert_eq!(report.pruned, 2);
    assert_eq!(
        times(&store.rows(TABLE).await, "BTC"),
        vec![at(12), at(13), at(14), at(15)]
    );
}

#[tokio::test]
async fn stale_assets_are_deleted_and_old_rows_pruned() {
    let candela = Candela::builder()
        .with_market(market("binance"))
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;
    store
        .seed_rows(
            TABLE,
            vec![
                h1_row("BTC", at(5)),
                h1_row("BTC", at(13)),
                h1_row("LUNA", at(12)),
            ],
        )
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.catchup(&store, &store, false, at(13)).await.unwrap();

    assert_eq!(report.stale_assets, vec![AssetId::from("crypto-LUNA")]);
    assert_eq!(report.planned, 0, "observed extent already covers the window");
    assert_eq!(report.pruned, 1);
    let rows = store.rows(TABLE).await;
    assert!(times(&rows, "LUNA").is_empty());
    assert_eq!(times(&rows, "BTC"), vec![at(13)]);
}

#[tokio::test]
async fn deletion_only_skips_fetching() {
    let binance = market("binance");
    let candela = Candela::builder()
        .with_market(binance.clone())
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;
    store.seed_rows(TABLE, vec![h1_row("LUNA", at(12))]).await;

    let round = candela.open_round().await.unwrap();
    let report = round.catchup(&store, &store, true, at(13)).await.unwrap();

    assert_eq!(report.planned, 0);
    assert_eq!(report.written, 0);
    assert_eq!(report.stale_assets, vec![AssetId::from("crypto-LUNA")]);
    assert!(store.rows(TABLE).await.is_empty());
    assert!(binance.kline_calls.lock().await.is_empty());
}

#[tokio::test]
async fn one_failing_market_does_not_block_the_others() {
    let kraken = Arc::new(MockMarket {
        name: "kraken",
        klines_fail: Some("rate limited"),
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(market("binance"))
        .with_market(kraken)
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("DOT", "kraken")])
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.catchup(&store, &store, false, at(13)).await.unwrap();

    assert_eq!(report.planned, 2);
    assert_eq!(report.written, 4);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        CandelaError::Market { ref market, .. } if market == "kraken"
    ));
    let rows = store.rows(TABLE).await;
    assert_eq!(times(&rows, "BTC").len(), 4);
    assert!(times(&rows, "DOT").is_empty());
}

#[tokio::test]
async fn every_market_failing_fails_the_catchup() {
    let binance = Arc::new(MockMarket {
        name: "binance",
        klines_fail: Some("down"),
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(binance)
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    let err = round
        .catchup(&store, &store, false, at(13))
        .await
        .unwrap_err();
    assert!(matches!(err, CandelaError::AllMarketsFailed(ref es) if es.len() == 1));
    assert!(store.rows(TABLE).await.is_empty());
}

#[tokio::test]
async fn klines_outside_the_request_are_dropped_with_a_warning() {
    let binance = Arc::new(MockMarket {
        name: "binance",
        klines_fn: Some(Arc::new(|mut batch: candela::KlineBatch| {
            for task in batch.values_mut().flatten() {
                candela_mock::fixtures::klines::fill(task);
                let slot = task.slots.get_mut(&Timeframe::H1).unwrap();
                // one candle past the window, one off the hour
                slot.klines.push(h1_row("BTC", at(20)).kline);
                slot.klines
                    .push(h1_row("BTC", crate::helpers::dt(2024, 1, 1, 11, 30, 0)).kline);
            }
            Ok::<_, CandelaError>(batch)
        })),
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(binance)
        .asset_type(crypto_spec(&["binance"]))
        .kline_count(4)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    let report = round.catchup(&store, &store, false, at(13)).await.unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(report.written, 4);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(report.warnings[0], CandelaError::Data(ref msg) if msg.contains("2 invalid 1h")));
    assert_eq!(
        times(&store.rows(TABLE).await, "BTC"),
        vec![at(10), at(11), at(12), at(13)]
    );
}
