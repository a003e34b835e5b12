use std::sync::Arc;

use candela::{AssetId, Candela, CandelaError, Listing, MarketId, Status};
use candela_mock::InMemoryStore;

use crate::helpers::{MockMarket, crypto, crypto_spec, m_list, owned};

fn id(symbol: &str) -> AssetId {
    AssetId::from(format!("crypto-{symbol}"))
}

#[tokio::test]
async fn top_n_admitted_overflow_demoted_delisted_purged() {
    let binance = m_list(
        "binance",
        &[("A", 3), ("B", 2), ("C", 2), ("D", 0), ("E", -1)],
    );
    let candela = Candela::builder()
        .with_market(binance)
        .asset_type(crypto_spec(&["binance"]))
        .capacity(2)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster(["A", "B", "C", "D", "E"].map(|s| owned(s, "binance")))
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let outcome = report
        .market(&crypto(), &MarketId::from("binance"))
        .expect("binance ranked");
    assert_eq!(outcome.admitted, vec![id("A"), id("B")]);
    assert_eq!(outcome.demoted, vec![id("C"), id("D")]);
    assert_eq!(outcome.purged, vec![id("E")]);
    assert_eq!(report.applied, 5);

    let roster = store.roster().await;
    let status = |s: &str| roster.get(&id(s)).map(|a| a.status.value());
    assert_eq!(status("A"), Some(3));
    assert_eq!(status("B"), Some(2));
    assert_eq!(status("C"), Some(0));
    assert_eq!(status("D"), Some(0));
    assert_eq!(status("E"), None);
}

#[tokio::test]
async fn new_candidates_are_inserted_under_the_listing_market() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5), ("ETH", 4), ("DOGE", 1)]))
        .asset_type(crypto_spec(&["binance"]))
        .capacity(2)
        .build()
        .unwrap();
    let store = InMemoryStore::new();

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    let roster = store.roster().await;
    assert_eq!(roster.len(), 2, "overflow of unknown assets is not recorded");
    let btc = roster.get(&id("BTC")).unwrap();
    assert_eq!(btc.main_market, Some(MarketId::from("binance")));
    assert_eq!(btc.status, Status::new(5));
    assert!(roster.get(&id("DOGE")).is_none());
    assert_eq!(report.applied, 2);
}

#[tokio::test]
async fn assets_no_longer_listed_by_their_main_market_are_purged() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5)]))
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("LUNA", "binance")])
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    let outcome = report.market(&crypto(), &MarketId::from("binance")).unwrap();
    assert_eq!(outcome.purged, vec![id("LUNA")]);
    assert!(!store.roster().await.contains(&id("LUNA")));
}

#[tokio::test]
async fn failed_market_is_excluded_and_causes_no_delisting() {
    let failing = Arc::new(MockMarket {
        name: "binance",
        fail: Some("listing unavailable"),
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(failing)
        .with_market(m_list("kraken", &[("ETH", 4)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        CandelaError::Market { ref market, .. } if market == "binance"
    ));
    assert!(report.market(&crypto(), &MarketId::from("binance")).is_none());

    let roster = store.roster().await;
    assert!(roster.contains(&id("BTC")), "no delisting from a failed market");
    assert!(roster.contains(&id("ETH")));
}

#[tokio::test]
async fn failed_roster_update_becomes_a_warning() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5), ("ETH", 4)]))
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.fail_upserts_for(id("BTC")).await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        CandelaError::Admission { ref asset_id, .. } if asset_id == "crypto-BTC"
    ));
    let roster = store.roster().await;
    assert!(!roster.contains(&id("BTC")));
    assert!(roster.contains(&id("ETH")));
}

#[tokio::test]
async fn per_market_capacity_override_applies() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5), ("ETH", 4), ("SOL", 3)]))
        .with_market(m_list("kraken", &[("DOT", 5), ("LTC", 4), ("XRP", 3)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .capacity(2)
        .market_capacity("kraken", 1)
        .build()
        .unwrap();
    let store = InMemoryStore::new();

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    let admitted = |m: &str| {
        report
            .market(&crypto(), &MarketId::from(m))
            .map(|o| o.admitted.len())
    };
    assert_eq!(admitted("binance"), Some(2));
    assert_eq!(admitted("kraken"), Some(1));
    assert_eq!(store.roster().await.len(), 3);
}

#[tokio::test]
async fn asset_type_missing_from_the_listing_delists_nothing() {
    let binance = Arc::new(MockMarket {
        name: "binance",
        listing: Some(Listing::new()),
        ..Default::default()
    });
    let candela = Candela::builder()
        .with_market(binance)
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("ETH", "binance")])
        .await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert!(report.market(&crypto(), &MarketId::from("binance")).is_none());
    assert_eq!(report.applied, 0);
    let roster = store.roster().await;
    assert_eq!(roster.len(), 2);
    assert!(roster.contains(&id("BTC")));
    assert!(roster.contains(&id("ETH")));
}

#[tokio::test]
async fn empty_listing_for_the_type_still_purges() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[]))
        .asset_type(crypto_spec(&["binance"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    let report = round.update_assets(&store).await.unwrap();

    let outcome = report.market(&crypto(), &MarketId::from("binance")).unwrap();
    assert_eq!(outcome.purged, vec![id("BTC")]);
    assert!(store.roster().await.is_empty());
}
