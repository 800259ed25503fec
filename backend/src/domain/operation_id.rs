//! Request-scoped operation id for correlating logs and error payloads.
//!
//! The correlation middleware scopes the id of the current operation in
//! task-local storage so errors can pick it up without threading it through
//! every call. Task-locals are not inherited by spawned tasks; wrap spawned
//! work in [`OperationId::scope`] to keep the id visible.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task_local;

/// Response header echoing the operation id.
pub const TRACE_ID_HEADER: &str = "trace-id";

task_local! {
    static OPERATION_ID: OperationId;
}

/// Operation id of the request being served.
///
/// # Examples
/// ```
/// use backend::domain::OperationId;
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let id = OperationId::new("0af7651916cd43dd8448eb211c80319c");
/// let seen = OperationId::scope(id.clone(), async { OperationId::current() }).await;
/// assert_eq!(seen, Some(id));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId(Arc<str>);

impl OperationId {
    /// Wrap an operation id.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id in scope, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        OPERATION_ID.try_with(Clone::clone).ok()
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Run `fut` with `id` in scope.
    pub async fn scope<Fut>(id: Self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        OPERATION_ID.scope(id, fut).await
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;

    #[tokio::test]
    async fn current_reflects_scope() {
        let id = OperationId::new("op-1");
        let seen = OperationId::scope(id.clone(), async { OperationId::current() }).await;
        assert_eq!(seen, Some(id));
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(OperationId::current().is_none());
    }

    #[tokio::test]
    async fn spawned_tasks_need_an_explicit_scope() {
        let id = OperationId::new("op-2");
        let inherited = OperationId::scope(id.clone(), async {
            tokio::spawn(async { OperationId::current() })
                .await
                .expect("task joins")
        })
        .await;
        assert!(inherited.is_none());

        let rescoped = tokio::spawn(OperationId::scope(id.clone(), async {
            OperationId::current()
        }))
        .await
        .expect("task joins");
        assert_eq!(rescoped, Some(id));
    }
}
