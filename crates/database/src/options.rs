//! Connection options.

use trellis_query::PlannerOptions;

const DEFAULT_BTREE_ORDER: usize = 64;

/// Options for `Database::connect`.
///
/// ```
/// use trellis_database::ConnectOptions;
///
/// let options = ConnectOptions::default().btree_order(32).enable_row_count_pass(false);
/// assert_eq!(options.btree_order, 32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Fan-out of every B+tree index.
    pub btree_order: usize,
    /// Answer `SELECT COUNT(*)` from index statistics.
    pub enable_row_count_pass: bool,
    /// Push LIMIT/SKIP into index range scans.
    pub enable_limit_skip_pass: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            btree_order: DEFAULT_BTREE_ORDER,
            enable_row_count_pass: true,
            enable_limit_skip_pass: true,
        }
    }
}

impl ConnectOptions {
    pub fn btree_order(mut self, order: usize) -> Self {
        self.btree_order = order;
        self
    }

    pub fn enable_row_count_pass(mut self, enabled: bool) -> Self {
        self.enable_row_count_pass = enabled;
        self
    }

    pub fn enable_limit_skip_pass(mut self, enabled: bool) -> Self {
        self.enable_limit_skip_pass = enabled;
        self
    }

    pub(crate) fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            enable_row_count_pass: self.enable_row_count_pass,
            enable_limit_skip_pass: self.enable_limit_skip_pass,
        }
    }
}
