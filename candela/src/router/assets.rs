use candela_core::{
    AdmissionReport, Asset, AssetTypeId, CandelaError, Capability, Registry, RosterStore,
    mark_delisted, plan_admission,
};

use crate::router::round::Round;

impl Round<'_> {
    /// Refresh the roster from the active markets' listings.
    ///
    /// Behavior:
    /// - lists the active assets of every `(asset type, market)` pair
    ///   concurrently; a failing market is reported in `warnings` and its pairs
    ///   are left out of the round;
    /// - roster assets that their main market no longer lists are treated as
    ///   delisted (only for markets that answered);
    /// - ranks candidates per market and plans admissions, demotions and purges;
    /// - applies each decision on its own through `roster`; a failed decision
    ///   is reported in `warnings` and does not stop the others.
    ///
    /// # Errors
    /// Returns an error if the roster cannot be read, the request deadline
    /// elapses, or every market fails to list its assets.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::round::update_assets", skip(self, roster), fields(markets = self.active.len()))
    )]
    pub async fn update_assets(
        &self,
        roster: &dyn RosterStore,
    ) -> Result<AdmissionReport, CandelaError> {
        let current = roster.read_roster().await?;

        let work: Registry<Asset> = Registry::from_base(&self.base);
        let listed = self
            .fan_out(Capability::ActiveAssets, work, |m, slice| {
                let types: Vec<AssetTypeId> = slice.into_keys().collect();
                async move { m.list_active_assets(&types).await }
            })
            .await?;

        let mut candidates = listed.merged;
        let _delisted = mark_delisted(&current, &mut candidates);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            candidates = candidates.len(),
            delisted = _delisted,
            answered = listed.answered.len(),
            "asset listings merged"
        );

        let cfg = &self.candela.cfg;
        let plan = plan_admission(&current, &candidates, &self.base, |m| cfg.capacity_for(m));

        let mut report = AdmissionReport {
            markets: plan.markets,
            applied: 0,
            warnings: listed.errors,
        };
        report.warnings.extend(plan.warnings);

        for decision in &plan.decisions {
            match roster.upsert_roster(decision).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        asset_id = %decision.asset_id(),
                        decision = decision.kind(),
                        error = %e,
                        "roster update failed"
                    );
                    report
                        .warnings
                        .push(CandelaError::admission(decision.asset_id().as_str(), e.to_string()));
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            applied = report.applied,
            warnings = report.warnings.len(),
            "assets updated"
        );
        Ok(report)
    }
}
