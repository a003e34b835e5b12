use candela::{AssetId, Candela, MarketId};
use candela_mock::InMemoryStore;

use crate::helpers::{crypto_spec, m_list, owned};

fn id(symbol: &str) -> AssetId {
    AssetId::from(format!("crypto-{symbol}"))
}

fn main_market(roster: &candela::Roster, symbol: &str) -> Option<MarketId> {
    roster.get(&id(symbol)).and_then(|a| a.main_market.clone())
}

#[tokio::test]
async fn preferred_market_takes_ownership() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("ETH", 4)]))
        .with_market(m_list("kraken", &[("ETH", 9)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("ETH", "kraken")]).await;

    let round = candela.open_round().await.unwrap();
    round.update_assets(&store).await.unwrap();

    let roster = store.roster().await;
    assert_eq!(main_market(&roster, "ETH"), Some(MarketId::from("binance")));
    let eth = roster.get(&id("ETH")).unwrap();
    assert!(eth.market_ids.contains(&MarketId::from("kraken")));
    assert!(eth.market_ids.contains(&MarketId::from("binance")));
}

#[tokio::test]
async fn less_preferred_market_only_links() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 2)]))
        .with_market(m_list("kraken", &[("BTC", 9)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.seed_roster([owned("BTC", "binance")]).await;

    let round = candela.open_round().await.unwrap();
    round.update_assets(&store).await.unwrap();

    let roster = store.roster().await;
    let btc = roster.get(&id("BTC")).unwrap();
    assert_eq!(btc.main_market, Some(MarketId::from("binance")));
    assert_eq!(btc.status.value(), 2, "status comes from the owning market");
    assert!(btc.market_ids.contains(&MarketId::from("kraken")));
}

#[tokio::test]
async fn less_preferred_market_cannot_demote_or_purge() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5), ("ETH", 4)]))
        .with_market(m_list("kraken", &[("DOT", 9), ("BTC", 1), ("ETH", -1)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .capacity(1)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store
        .seed_roster([owned("BTC", "binance"), owned("ETH", "binance")])
        .await;

    let round = candela.open_round().await.unwrap();
    round.update_assets(&store).await.unwrap();

    let roster = store.roster().await;
    // binance keeps BTC and demotes ETH; kraken overflows BTC and delists ETH
    // but neither is its asset.
    assert_eq!(roster.get(&id("BTC")).map(|a| a.status.value()), Some(5));
    assert_eq!(roster.get(&id("ETH")).map(|a| a.status.value()), Some(0));
    assert_eq!(main_market(&roster, "DOT"), Some(MarketId::from("kraken")));
}

#[tokio::test]
async fn ownership_is_stable_across_rounds() {
    let candela = Candela::builder()
        .with_market(m_list("binance", &[("BTC", 5), ("ETH", 4)]))
        .with_market(m_list("kraken", &[("ETH", 9), ("DOT", 3)]))
        .asset_type(crypto_spec(&["binance", "kraken"]))
        .build()
        .unwrap();
    let store = InMemoryStore::new();

    let round = candela.open_round().await.unwrap();
    round.update_assets(&store).await.unwrap();
    let first = store.roster().await;
    round.update_assets(&store).await.unwrap();
    let second = store.roster().await;

    assert_eq!(first, second);
    assert_eq!(main_market(&second, "ETH"), Some(MarketId::from("binance")));
    assert_eq!(main_market(&second, "DOT"), Some(MarketId::from("kraken")));
}
