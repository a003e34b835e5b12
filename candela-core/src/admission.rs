//! Ranking and admission control.
//!
//! Admission is planned as a pure function of the current [`Roster`] and the
//! candidates each market listed; the resulting [`Decision`]s are applied by a
//! [`RosterStore`](crate::connector::RosterStore) one asset at a time.
//!
//! Per `(asset type, market)` with capacity `N`:
//! 1. candidates are stably sorted by status, highest first;
//! 2. `status >= 0` candidates are ranked, `status == -1` ones are delisted;
//! 3. the top `N` ranked are admitted, the rest are demoted to status `0`;
//! 4. admitted assets are inserted when unknown; a known asset changes owner
//!    only when this market is strictly more preferred than its current main
//!    market (lower index in the asset type's referent markets);
//! 5. delisted assets are purged.
//!
//! Demotions and purges never touch an asset owned by a strictly more
//! preferred market, nor an asset the roster does not know.

use std::collections::BTreeSet;

use candela_types::{
    Asset, AssetId, AssetTypeSpec, BaseConfig, CandelaError, MarketAdmission, MarketId, Status,
};

use crate::registry::Registry;
use crate::roster::{Decision, Roster};

/// Outcome of ranking one market's candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking<'a> {
    /// Top-N ranked candidates, best first.
    pub admitted: Vec<&'a Asset>,
    /// Ranked candidates beyond the capacity.
    pub demoted: Vec<&'a Asset>,
    /// Candidates with status `-1`.
    pub delisted: Vec<&'a Asset>,
    /// Candidates with a status below `-1`.
    pub invalid: Vec<&'a Asset>,
}

/// Decisions for one `(asset type, market)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPlan {
    /// Roster transitions, in application order.
    pub decisions: Vec<Decision>,
    /// Report entry for this pair.
    pub outcome: MarketAdmission,
    /// Skipped candidates.
    pub warnings: Vec<CandelaError>,
}

/// Decisions for a whole round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPlan {
    /// Roster transitions, in application order.
    pub decisions: Vec<Decision>,
    /// One entry per `(asset type, market)` pair that listed candidates.
    pub markets: Vec<MarketAdmission>,
    /// Skipped candidates.
    pub warnings: Vec<CandelaError>,
}

/// Rank `candidates` and split them around `capacity`.
///
/// The sort is stable, so equal statuses keep their listing order. Repeated
/// asset ids keep their best-ranked occurrence only.
#[must_use]
pub fn rank_market(candidates: &[Asset], capacity: usize) -> Ranking<'_> {
    let mut sorted: Vec<&Asset> = candidates.iter().collect();
    sorted.sort_by(|a, b| b.status.cmp(&a.status));

    let mut seen: BTreeSet<&AssetId> = BTreeSet::new();
    let mut ranking = Ranking::default();
    let mut ranked: Vec<&Asset> = Vec::new();
    for asset in sorted {
        if !seen.insert(&asset.asset_id) {
            continue;
        }
        if asset.status.is_ranked() {
            ranked.push(asset);
        } else if asset.status.is_delisted() {
            ranking.delisted.push(asset);
        } else {
            ranking.invalid.push(asset);
        }
    }
    if ranked.len() > capacity {
        ranking.demoted = ranked.split_off(capacity);
    }
    ranking.admitted = ranked;
    ranking
}

/// True when `candidate` ranks strictly before `incumbent` in the referent order.
///
/// Markets outside the referent list (and a missing incumbent) rank last.
#[must_use]
pub fn prefers(spec: &AssetTypeSpec, candidate: &MarketId, incumbent: Option<&MarketId>) -> bool {
    let last = spec.referent_markets.len();
    let rank = |m: &MarketId| spec.referent_rank(m).unwrap_or(last);
    rank(candidate) < incumbent.map_or(last + 1, rank)
}

fn owner_outranks(spec: &AssetTypeSpec, record: &Asset, market: &MarketId) -> bool {
    record
        .main_market
        .as_ref()
        .is_some_and(|owner| owner != market && prefers(spec, owner, Some(market)))
}

/// Plan the roster transitions for one market's candidates.
#[must_use]
pub fn plan_market(
    roster: &Roster,
    spec: &AssetTypeSpec,
    market: &MarketId,
    candidates: &[Asset],
    capacity: usize,
) -> MarketPlan {
    let ranking = rank_market(candidates, capacity);
    let mut decisions = Vec::new();
    let mut outcome = MarketAdmission {
        asset_type: spec.id.clone(),
        market: market.clone(),
        admitted: Vec::with_capacity(ranking.admitted.len()),
        demoted: Vec::new(),
        purged: Vec::new(),
    };

    let warnings = ranking
        .invalid
        .iter()
        .map(|a| {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                asset_id = %a.asset_id,
                market = %market,
                status = a.status.value(),
                "invalid status; candidate skipped"
            );
            CandelaError::admission(
                a.asset_id.as_str(),
                format!("status {} is below -1", a.status),
            )
        })
        .collect();

    for candidate in ranking.admitted {
        outcome.admitted.push(candidate.asset_id.clone());
        let decision = match roster.get(&candidate.asset_id) {
            None => {
                let mut asset = candidate.clone();
                asset.type_id = spec.id.clone();
                Decision::Insert {
                    asset,
                    market: market.clone(),
                }
            }
            Some(record) => {
                let owner = record.main_market.as_ref();
                if owner == Some(market) || prefers(spec, market, owner) {
                    Decision::Reassign {
                        asset: candidate.clone(),
                        market: market.clone(),
                    }
                } else {
                    Decision::Link {
                        asset_id: candidate.asset_id.clone(),
                        market: market.clone(),
                    }
                }
            }
        };
        decisions.push(decision);
    }

    for candidate in ranking.demoted {
        let Some(record) = roster.get(&candidate.asset_id) else {
            continue;
        };
        if owner_outranks(spec, record, market) {
            continue;
        }
        outcome.demoted.push(candidate.asset_id.clone());
        decisions.push(Decision::Demote {
            asset_id: candidate.asset_id.clone(),
        });
    }

    for candidate in ranking.delisted {
        let Some(record) = roster.get(&candidate.asset_id) else {
            continue;
        };
        if owner_outranks(spec, record, market) {
            continue;
        }
        outcome.purged.push(candidate.asset_id.clone());
        decisions.push(Decision::Purge {
            asset_id: candidate.asset_id.clone(),
        });
    }

    MarketPlan {
        decisions,
        outcome,
        warnings,
    }
}

/// Plan admission for every `(asset type, market)` pair present in `candidates`.
///
/// Markets are visited per asset type in referent order, each one seeing the
/// roster as updated by the decisions of the markets before it. Pairs missing
/// from `candidates` (markets that did not answer) are skipped entirely.
#[must_use]
pub fn plan_admission<F>(
    roster: &Roster,
    candidates: &Registry<Asset>,
    base: &BaseConfig,
    capacity: F,
) -> AdmissionPlan
where
    F: Fn(&MarketId) -> usize,
{
    let mut working = roster.clone();
    let mut plan = AdmissionPlan::default();
    for spec in &base.asset_types {
        for market in &spec.referent_markets {
            let Some(listed) = candidates.get(&spec.id, market) else {
                continue;
            };
            let mp = plan_market(&working, spec, market, listed, capacity(market));
            for d in &mp.decisions {
                working.apply(d);
            }
            plan.decisions.extend(mp.decisions);
            plan.markets.push(mp.outcome);
            plan.warnings.extend(mp.warnings);
        }
    }
    plan
}

/// Add a `status = -1` candidate for every roster asset its main market no
/// longer lists.
///
/// Only pairs present in `candidates` are considered, so a market that failed
/// to answer never causes a delisting. Returns the number of candidates added.
pub fn mark_delisted(roster: &Roster, candidates: &mut Registry<Asset>) -> usize {
    let mut added = 0;
    for record in roster.iter() {
        let Some(market) = &record.main_market else {
            continue;
        };
        let Some(listed) = candidates.get(&record.type_id, market) else {
            continue;
        };
        if listed.iter().any(|a| a.asset_id == record.asset_id) {
            continue;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(asset_id = %record.asset_id, market = %market, "no longer listed; marking delisted");
        let delisted = record.clone().with_status(Status::DELISTED);
        if candidates.add_item(&record.type_id, market, delisted) {
            added += 1;
        }
    }
    added
}
