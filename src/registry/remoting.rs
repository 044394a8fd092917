use std::{collections::BTreeSet, fmt, sync::Arc};

use flexlink_error::FlexResult;
use serde_json::Value;

/// Service object exposed to clients through a remoting destination.
pub trait RemotingTarget: Send + Sync {
    fn invoke(
        &self,
        operation: &str,
        args: &[Value],
    ) -> FlexResult<Value>;
}

impl<F> RemotingTarget for F
where
    F: Fn(&str, &[Value]) -> FlexResult<Value> + Send + Sync,
{
    fn invoke(
        &self,
        operation: &str,
        args: &[Value],
    ) -> FlexResult<Value> {
        self(operation, args)
    }
}

/// Which operations of a target clients may call.
///
/// Exclusions always win. An empty include list allows everything not
/// excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotingOptions {
    pub include_methods: BTreeSet<String>,
    pub exclude_methods: BTreeSet<String>,
}

impl RemotingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(
        mut self,
        operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.include_methods
            .extend(operations.into_iter().map(Into::into));
        self
    }

    pub fn exclude(
        mut self,
        operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.exclude_methods
            .extend(operations.into_iter().map(Into::into));
        self
    }

    pub fn is_allowed(
        &self,
        operation: &str,
    ) -> bool {
        if self.exclude_methods.contains(operation) {
            return false;
        }
        self.include_methods.is_empty() || self.include_methods.contains(operation)
    }
}

/// A registered remoting target together with its options.
#[derive(Clone)]
pub struct RemotingExport {
    target: Arc<dyn RemotingTarget>,
    options: RemotingOptions,
}

impl RemotingExport {
    pub fn new(
        target: Arc<dyn RemotingTarget>,
        options: RemotingOptions,
    ) -> Self {
        Self { target, options }
    }

    pub fn target(&self) -> &Arc<dyn RemotingTarget> {
        &self.target
    }

    pub fn options(&self) -> &RemotingOptions {
        &self.options
    }
}

impl fmt::Debug for RemotingExport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RemotingExport")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
