use candela_core::{Asset, AssetTypeId, Status};

type Row = (&'static str, &'static str, i32);

const CRYPTO_PRIMARY: &[Row] = &[
    ("BTC", "Bitcoin", 9),
    ("ETH", "Ethereum", 8),
    ("SOL", "Solana", 7),
    ("XRP", "XRP", 5),
    ("DOGE", "Dogecoin", 3),
    ("ADA", "Cardano", 0),
    ("LUNA", "Terra", -1),
];

const CRYPTO_SECONDARY: &[Row] = &[
    ("ETH", "Ethereum", 9),
    ("BTC", "Bitcoin", 8),
    ("DOT", "Polkadot", 6),
    ("XRP", "XRP", 4),
    ("LTC", "Litecoin", 2),
];

const STOCK: &[Row] = &[
    ("AAPL", "Apple Inc.", 5),
    ("MSFT", "Microsoft Corporation", 4),
    ("GOOG", "Alphabet Inc.", 3),
    ("TSLA", "Tesla, Inc.", 1),
];

/// Deterministic listing of `asset_type` on `market`.
///
/// Markets named `binance` (or anything else) serve the primary crypto
/// ranking; `kraken` serves a secondary one that overlaps it.
pub fn by_market(market: &str, asset_type: &AssetTypeId) -> Vec<Asset> {
    let rows = match (asset_type.as_str(), market) {
        ("crypto", "kraken") => CRYPTO_SECONDARY,
        ("crypto", _) => CRYPTO_PRIMARY,
        ("stock", _) => STOCK,
        _ => &[],
    };
    rows.iter()
        .map(|(symbol, name, status)| asset(asset_type, symbol, name, *status))
        .collect()
}

fn asset(asset_type: &AssetTypeId, symbol: &str, name: &str, status: i32) -> Asset {
    let (id, ticker) = if asset_type.as_str() == "crypto" {
        (format!("crypto-{symbol}USDC"), format!("{symbol}USDC"))
    } else {
        (format!("{asset_type}-{symbol}"), symbol.to_string())
    };
    let a = Asset::new(id, ticker, asset_type.clone())
        .with_name(name)
        .with_status(Status::new(status));
    if asset_type.as_str() == "crypto" {
        a.with_attribute("base_asset", symbol)
            .with_attribute("quote_asset", "USDC")
    } else {
        a
    }
}
