use std::sync::Arc;

use candela::{AssetTypeSpec, Candela, Timeframe};
use candela_mock::{InMemoryStore, MockMarket};
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug,candela_core=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    // 1. Two fixture markets; binance is the more authoritative one for crypto.
    let candela = Candela::builder()
        .with_market(Arc::new(MockMarket::named("binance")))
        .with_market(Arc::new(MockMarket::named("kraken")))
        .asset_type(
            AssetTypeSpec::new("crypto", "Crypto", &["binance", "kraken"])
                .with_timeframes(&[Timeframe::H1, Timeframe::D1]),
        )
        .capacity(3)
        .kline_count(48)
        .build()?;
    let store = InMemoryStore::new();

    // 2. Open a round over the markets that answer.
    let round = candela.open_round().await?;
    println!("active markets: {:?}", round.markets());

    // 3. Refresh the roster from the listings.
    let admission = round.update_assets(&store).await?;
    for m in &admission.markets {
        println!(
            "{}/{}: admitted {:?}, demoted {:?}, purged {:?}",
            m.asset_type, m.market, m.admitted, m.demoted, m.purged
        );
    }

    // 4. Catch up the kline inventory, then refresh what is due at the next hour.
    let now = chrono::Utc::now();
    let sync = round.catchup(&store, &store, false, now).await?;
    println!(
        "catch-up: planned {} windows, wrote {} rows, pruned {}",
        sync.planned, sync.written, sync.pruned
    );

    let next_hour = Timeframe::H1.floor(now) + Timeframe::H1.period();
    let due = round.refresh_due(&store, &store, next_hour).await?;
    println!("refresh at {next_hour}: wrote {} rows", due.written);

    Ok(())
}
