use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use candela_core::{Kline, KlineTask, TimeWindow, Timeframe};

/// One synthetic candle per period of `window`, oldest first.
///
/// Prices depend only on `seed` and the open time, so two fetches of the same
/// range return identical rows.
pub fn synthesize(seed: &str, timeframe: Timeframe, window: &TimeWindow) -> Vec<Kline> {
    let base = i64::from(seed.bytes().map(u32::from).sum::<u32>() % 500) + 100;
    let step = timeframe.period();
    let mut out = Vec::new();
    let mut at = timeframe.floor(window.oldest());
    if at < window.oldest() {
        at += step;
    }
    while at <= window.latest() {
        out.push(candle(base, at));
        at += step;
    }
    out
}

fn candle(base: i64, at: DateTime<Utc>) -> Kline {
    let wiggle = (at.timestamp() / 60) % 7;
    let open = Decimal::new((base + wiggle) * 100, 2);
    let close = Decimal::new((base + (wiggle + 3) % 7) * 100, 2);
    Kline {
        open_time: at,
        open,
        high: open.max(close) + Decimal::ONE,
        low: open.min(close) - Decimal::ONE,
        close,
        volume: Decimal::new(1_000 + wiggle * 10, 0),
    }
}

/// Fill every slot of `task` with synthetic candles.
pub fn fill(task: &mut KlineTask) {
    let seed = task.asset.asset_id.as_str().to_string();
    for (tf, slot) in &mut task.slots {
        slot.klines = synthesize(&seed, *tf, &slot.window);
    }
}
