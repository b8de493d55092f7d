use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::bitmask::Mask;
use crate::collapse::collapse_groups;
use crate::error::SolveError;
use crate::parallel::{self, ProgressHook, SearchOutput, Watchdog};
use crate::precombine::precombine;
use crate::search::{CancelToken, GroupColumns, MAX_GROUPS};

/// What a [`Solution`] carries back from the search. Counting is strictly
/// cheaper than either enumeration mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ReturnKind {
    #[default]
    Count,
    CombinedMasks,
    Indices,
}

impl FromStr for ReturnKind {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, SolveError> {
        match s {
            "count" => Ok(ReturnKind::Count),
            "combined_masks" => Ok(ReturnKind::CombinedMasks),
            "indices" => Ok(ReturnKind::Indices),
            other => Err(SolveError::InvalidConfig(format!("unknown return type `{other}`"))),
        }
    }
}

/// Search strategy. Backtracking is the only one defined.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Method {
    #[default]
    Backtracking,
}

impl FromStr for Method {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, SolveError> {
        match s {
            "backtracking" => Ok(Method::Backtracking),
            other => Err(SolveError::InvalidConfig(format!("unknown method `{other}`"))),
        }
    }
}

/// An ordered list of candidate groups, one mask to be chosen per group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Problem {
    groups: Vec<Vec<Mask>>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = Mask>,
    {
        let mut problem = Self::new();
        for group in groups {
            problem.add_group(group);
        }
        problem
    }

    /// Append one candidate group. Repeated masks within the group are a
    /// degenerate input; only the first occurrence is kept.
    pub fn add_group<G: IntoIterator<Item = Mask>>(&mut self, masks: G) {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for mask in masks {
            if seen.insert(mask) {
                unique.push(mask);
            }
        }
        self.groups.push(unique);
    }

    pub fn groups(&self) -> &[Vec<Mask>] {
        &self.groups
    }

    /// number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Solver options. The defaults collapse duplicate groups and fan the search
/// out over all available cores.
#[derive(Clone)]
pub struct SolverConfig {
    pub return_kind: ReturnKind,
    /// Collapse identical groups and search their slots jointly.
    pub symmetry: bool,
    /// Split the first group's candidates across worker threads.
    pub parallel: bool,
    pub method: Method,
    /// Reserved tuning knobs. Unknown keys are accepted and ignored.
    pub heuristics: BTreeMap<String, String>,
    /// Cancel the solve once this much wall-clock time has passed.
    pub timeout: Option<Duration>,
    /// External cancellation handle; the caller keeps a clone and fires it.
    pub cancel: Option<CancelToken>,
    /// Called once per completed first-group task with (completed, total).
    pub progress: Option<ProgressHook>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            return_kind: ReturnKind::Count,
            symmetry: true,
            parallel: true,
            method: Method::Backtracking,
            heuristics: BTreeMap::new(),
            timeout: None,
            cancel: None,
            progress: None,
        }
    }
}

/// Solver output. `count` is always filled; the enumeration buffers only for
/// the matching [`ReturnKind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    pub count: u64,
    pub combined_masks: Option<Vec<Mask>>,
    pub indices: Option<Vec<Vec<u32>>>,
    /// Stage timings (microseconds) and search shape, keyed by name.
    pub profiling: BTreeMap<String, u64>,
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Solution(count={}", self.count)?;
        if let Some(ref masks) = self.combined_masks {
            write!(f, ", combined_masks={}", masks.len())?;
        }
        if let Some(ref indices) = self.indices {
            write!(f, ", indices={}", indices.len())?;
        }
        write!(f, ")")
    }
}

/// Count or enumerate all ways to pick one mask per group with every pair of
/// picks disjoint.
///
/// Pipeline: collapse identical groups, precombine collapsed groups into
/// unordered multi-mask unions, split into limb columns sorted smallest group
/// first, then run the backtracking fan-out.
pub fn solve(problem: &Problem, config: &SolverConfig) -> Result<Solution, SolveError> {
    let Method::Backtracking = config.method;
    if problem.len() > MAX_GROUPS {
        return Err(SolveError::InvalidConfig(format!(
            "problem has {} groups, the search supports at most {MAX_GROUPS}",
            problem.len()
        )));
    }
    if !config.heuristics.is_empty() {
        debug!(keys = config.heuristics.len(), "ignoring unrecognized heuristics");
    }

    let mut profiling = BTreeMap::new();

    let started = Instant::now();
    let collapsed = collapse_groups(problem.groups(), config.symmetry);
    profiling.insert("collapse_us".to_string(), started.elapsed().as_micros() as u64);

    let started = Instant::now();
    let mut columns: Vec<GroupColumns> = collapsed
        .iter()
        .map(|group| GroupColumns::from_masks(&precombine(group)))
        .collect();
    // smallest fan-out first, so infeasible prefixes die as early as possible
    columns.sort_by_key(GroupColumns::len);
    profiling.insert("precombine_us".to_string(), started.elapsed().as_micros() as u64);
    profiling.insert("groups".to_string(), columns.len() as u64);

    let cancel = config.cancel.clone().unwrap_or_default();
    let watchdog = config.timeout.map(|timeout| Watchdog::arm(&cancel, timeout));

    let started = Instant::now();
    let output = parallel::run(
        &columns,
        config.return_kind,
        config.parallel,
        &cancel,
        config.progress.as_ref(),
    );
    if let Some(watchdog) = watchdog {
        watchdog.disarm();
    }
    let output = output?;
    profiling.insert("search_us".to_string(), started.elapsed().as_micros() as u64);

    let mut solution = Solution { profiling, ..Default::default() };
    match output {
        SearchOutput::Count(count) => solution.count = count,
        SearchOutput::Masks(masks) => {
            solution.count = masks.len() as u64;
            solution.combined_masks = Some(masks);
        }
        SearchOutput::Indices(indices) => {
            solution.count = indices.len() as u64;
            solution.indices = Some(indices);
        }
    }
    debug!(count = solution.count, "solve finished");
    Ok(solution)
}
