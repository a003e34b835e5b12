use chrono::{DateTime, Utc};

use candela_core::{
    CandelaError, Capability, KlineRow, KlineStore, KlineTask, Registry, RosterStore,
    SyncReport, Timeframe, desired_for_base, due_timeframes, plan_catchup, plan_refresh,
    retention_cutoffs, stale_assets,
};

use crate::router::round::Round;

/// Rows gathered from one kline fan-out.
struct Fetched {
    rows: Vec<KlineRow>,
    fetched: usize,
    errors: Vec<CandelaError>,
}

impl Round<'_> {
    async fn fetch_rows(&self, mut plan: Registry<KlineTask>) -> Result<Fetched, CandelaError> {
        // markets with nothing to fetch are not called
        plan.drop_empty();
        if plan.is_empty() {
            return Ok(Fetched {
                rows: Vec::new(),
                fetched: 0,
                errors: Vec::new(),
            });
        }
        let out = self
            .fan_out(Capability::Klines, plan, |m, batch| async move {
                m.fetch_klines(batch).await
            })
            .await?;
        let mut errors = out.errors;
        let mut rows = Vec::new();
        for (_, by_market) in out.merged.into_inner() {
            for (market, tasks) in by_market {
                for mut task in tasks {
                    for (tf, n) in task.discard_invalid() {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            market = %market,
                            asset_id = %task.asset.asset_id,
                            timeframe = %tf,
                            dropped = n,
                            "invalid klines dropped"
                        );
                        errors.push(CandelaError::data(format!(
                            "{market} returned {n} invalid {tf} klines for {}",
                            task.asset.asset_id
                        )));
                    }
                    rows.extend(task.rows());
                }
            }
        }
        Ok(Fetched {
            fetched: rows.len(),
            rows,
            errors,
        })
    }

    async fn write(
        &self,
        klines: &dyn KlineStore,
        rows: &[KlineRow],
    ) -> Result<usize, CandelaError> {
        if rows.is_empty() {
            return Ok(0);
        }
        klines.write_rows(&self.candela.cfg.table, rows).await
    }

    /// Bring every roster asset up to the desired window of each timeframe.
    ///
    /// Behavior:
    /// - desired windows hold the configured number of periods ending at
    ///   `reference`, per asset type and timeframe;
    /// - rows of assets that left the roster are deleted;
    /// - only the missing range of each `(asset, timeframe)` is fetched, from the
    ///   asset's main market;
    /// - rows older than the desired window are pruned.
    ///
    /// With `deletion_only`, nothing is fetched or written; stale assets and
    /// old rows are still removed.
    ///
    /// # Errors
    /// Returns storage errors, a request timeout, or the collapsed error when
    /// every market failed to serve klines.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::round::catchup",
            skip(self, klines, roster, reference),
            fields(reference = %reference),
        )
    )]
    pub async fn catchup(
        &self,
        klines: &dyn KlineStore,
        roster: &dyn RosterStore,
        deletion_only: bool,
        reference: DateTime<Utc>,
    ) -> Result<SyncReport, CandelaError> {
        let cfg = &self.candela.cfg;
        let current = roster.read_roster().await?;
        let state = klines.read_window_state(&cfg.table).await?;
        let desired = desired_for_base(&self.base, cfg.kline_count, reference)?;

        let mut report = SyncReport {
            stale_assets: stale_assets(&state, &current),
            ..SyncReport::default()
        };

        if !report.stale_assets.is_empty() {
            let _removed = klines
                .delete_assets(&cfg.table, &report.stale_assets)
                .await?;
            #[cfg(feature = "tracing")]
            tracing::info!(
                assets = report.stale_assets.len(),
                rows = _removed,
                "stale assets removed"
            );
        }

        if !deletion_only {
            let plan = plan_catchup(&current.to_registry(&self.base), &state, &desired);
            report.planned = plan.items().map(|t| t.slots.len()).sum();
            #[cfg(feature = "tracing")]
            tracing::debug!(
                assets = plan.len(),
                windows = report.planned,
                "catch-up planned"
            );
            let fetched = self.fetch_rows(plan).await?;
            report.fetched = fetched.fetched;
            report.warnings = fetched.errors;
            report.written = self.write(klines, &fetched.rows).await?;
        }

        report.pruned = klines
            .prune_before(&cfg.table, &retention_cutoffs(&desired))
            .await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            planned = report.planned,
            fetched = report.fetched,
            written = report.written,
            pruned = report.pruned,
            warnings = report.warnings.len(),
            "catch-up done"
        );
        Ok(report)
    }

    /// Fetch the latest period of `timeframes` for assets that already have
    /// stored rows.
    ///
    /// Assets and timeframes without stored rows are left to the next
    /// catch-up. An empty `timeframes` slice is a no-op.
    ///
    /// # Errors
    /// Returns `UnsupportedTimeframe` when a timeframe is tracked by no asset
    /// type, storage errors, a request timeout, or the collapsed error when
    /// every market failed.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::round::refresh",
            skip(self, klines, roster, timeframes, reference),
            fields(reference = %reference, timeframes = ?timeframes),
        )
    )]
    pub async fn refresh(
        &self,
        klines: &dyn KlineStore,
        roster: &dyn RosterStore,
        timeframes: &[Timeframe],
        reference: DateTime<Utc>,
    ) -> Result<SyncReport, CandelaError> {
        if timeframes.is_empty() {
            return Ok(SyncReport::default());
        }
        let current = roster.read_roster().await?;
        let state = klines.read_window_state(&self.candela.cfg.table).await?;
        let plan = plan_refresh(
            &current.to_registry(&self.base),
            &state,
            &self.base,
            timeframes,
            reference,
        )?;

        let mut report = SyncReport {
            planned: plan.items().map(|t| t.slots.len()).sum(),
            ..SyncReport::default()
        };
        let fetched = self.fetch_rows(plan).await?;
        report.fetched = fetched.fetched;
        report.warnings = fetched.errors;
        report.written = self.write(klines, &fetched.rows).await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            planned = report.planned,
            written = report.written,
            warnings = report.warnings.len(),
            "refresh done"
        );
        Ok(report)
    }

    /// Refresh the timeframes whose period closes exactly at `instant`.
    ///
    /// Timeframes no asset type tracks are ignored.
    ///
    /// # Errors
    /// Same as [`Round::refresh`].
    pub async fn refresh_due(
        &self,
        klines: &dyn KlineStore,
        roster: &dyn RosterStore,
        instant: DateTime<Utc>,
    ) -> Result<SyncReport, CandelaError> {
        let due: Vec<Timeframe> = due_timeframes(instant)
            .into_iter()
            .filter(|tf| self.base.asset_types.iter().any(|t| t.supports(*tf)))
            .collect();
        #[cfg(feature = "tracing")]
        tracing::debug!(instant = %instant, due = ?due, "timeframes due");
        self.refresh(klines, roster, &due, instant).await
    }
}
