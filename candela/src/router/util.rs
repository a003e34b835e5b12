use candela_core::{CandelaError, Capability};

/// Join a collection of tasks and apply an optional request-level deadline.
///
/// This wraps `futures::future::join_all(tasks)` with `crate::core::with_request_deadline`.
/// On timeout, the inner helper returns `CandelaError::RequestTimeout("request")` which
/// call sites can remap to a more specific capability label as needed.
pub async fn join_with_deadline<I, F, T>(
    tasks: I,
    deadline: Option<std::time::Duration>,
) -> Result<Vec<T>, CandelaError>
where
    I: IntoIterator<Item = F>,
    F: core::future::Future<Output = T>,
{
    crate::core::with_request_deadline(deadline, futures::future::join_all(tasks)).await
}

/// Collapse the errors of a fan-out in which no market succeeded.
///
/// Rules:
/// - If every error is `MarketTimeout` → `AllMarketsTimedOut(capability)`.
/// - Else → `AllMarketsFailed(errors)`.
pub fn collapse_errors(capability: Capability, errors: Vec<CandelaError>) -> CandelaError {
    if !errors.is_empty()
        && errors
            .iter()
            .all(|e| matches!(e, CandelaError::MarketTimeout { .. }))
    {
        return CandelaError::AllMarketsTimedOut {
            capability: capability.to_string(),
        };
    }
    CandelaError::AllMarketsFailed(errors)
}
