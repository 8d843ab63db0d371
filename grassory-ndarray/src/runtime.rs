use alloc::{
    collections::BTreeMap,
    rc::Rc,
    string::{String, ToString},
};
use core::cell::RefCell;

use grassory_core::{
    config::GradedConfig,
    error::ExprError,
    expr::{EinsumExpr, GroupingExpr, PartitionExpr},
    oracle::{BinaryOracle, ParityOracle},
};

type Cache<T> = RefCell<BTreeMap<String, Rc<T>>>;

/// Execution context of graded operations.
///
/// Carries the configuration, the parity oracle, and a cache of parsed expressions keyed by their
/// literal text, so renormalization loops that reuse a handful of expressions parse each one once.
/// The cache makes the runtime `!Sync`; use one runtime per thread.
#[derive(Debug)]
pub struct GradedRuntime<O: ParityOracle = BinaryOracle> {
    config: GradedConfig,
    oracle: O,
    einsum_cache: Cache<EinsumExpr>,
    grouping_cache: Cache<GroupingExpr>,
    partition_cache: Cache<PartitionExpr>,
}

impl GradedRuntime {
    /// Runtime with the default configuration and the binary oracle.
    pub fn new() -> Self {
        Self::with_oracle(GradedConfig::default(), BinaryOracle)
    }

    /// Runtime with the binary oracle.
    pub fn with_config(config: GradedConfig) -> Self {
        Self::with_oracle(config, BinaryOracle)
    }
}

impl Default for GradedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn cached<T>(
    cache: &Cache<T>,
    key: &str,
    parse: impl FnOnce(&str) -> Result<T, ExprError>,
) -> Result<Rc<T>, ExprError> {
    if let Some(hit) = cache.borrow().get(key) {
        return Ok(hit.clone());
    }
    let parsed = Rc::new(parse(key)?);
    cache.borrow_mut().insert(key.to_string(), parsed.clone());
    Ok(parsed)
}

impl<O: ParityOracle> GradedRuntime<O> {
    pub fn with_oracle(config: GradedConfig, oracle: O) -> Self {
        GradedRuntime {
            config,
            oracle,
            einsum_cache: RefCell::new(BTreeMap::new()),
            grouping_cache: RefCell::new(BTreeMap::new()),
            partition_cache: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &GradedConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Parsed contraction expression, from the cache when possible.
    pub fn einsum_expr(&self, expr: &str) -> Result<Rc<EinsumExpr>, ExprError> {
        cached(&self.einsum_cache, expr, EinsumExpr::parse)
    }

    /// Parsed grouping expression, from the cache when possible.
    pub fn grouping_expr(&self, expr: &str) -> Result<Rc<GroupingExpr>, ExprError> {
        cached(&self.grouping_cache, expr, GroupingExpr::parse)
    }

    /// Parsed partition expression, from the cache when possible.
    pub fn partition_expr(&self, expr: &str) -> Result<Rc<PartitionExpr>, ExprError> {
        cached(&self.partition_cache, expr, PartitionExpr::parse)
    }

    /// Number of cached expressions of all kinds.
    pub fn cached_expressions(&self) -> usize {
        self.einsum_cache.borrow().len()
            + self.grouping_cache.borrow().len()
            + self.partition_cache.borrow().len()
    }
}
