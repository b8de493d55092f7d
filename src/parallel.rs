use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use arrayvec::ArrayVec;
use rayon::prelude::*;
use tracing::debug;

use crate::bitmask::{EMPTY, Mask};
use crate::error::SolveError;
use crate::search::{CancelToken, GroupColumns, MAX_GROUPS, Searcher};
use crate::solver::ReturnKind;

/// Called once per completed first-group task with (completed, total).
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Per-worker search result, also the aggregated output handed to the facade.
pub enum SearchOutput {
    Count(u64),
    Masks(Vec<Mask>),
    Indices(Vec<Vec<u32>>),
}

/// Sets the cancel token once `timeout` elapses, unless disarmed first.
pub struct Watchdog {
    done: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn arm(cancel: &CancelToken, timeout: Duration) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&done);
        let token = cancel.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            if !seen.load(Ordering::SeqCst) {
                token.cancel();
            }
        });
        Watchdog { done }
    }

    pub fn disarm(&self) {
        self.done.store(true, Ordering::SeqCst);
    }
}

/// Run the backtracking search over size-sorted group columns, fanning the
/// first group's candidates out as independent tasks.
///
/// Each task owns its result buffer and runs a sequential [`Searcher`] on its
/// subtree; nothing mutable is shared between workers. Aggregation happens on
/// the calling thread after the join, in first-index order, so enumeration
/// output comes back in the same lexicographic order the sequential search
/// produces.
pub fn run(
    groups: &[GroupColumns],
    kind: ReturnKind,
    parallel: bool,
    cancel: &CancelToken,
    progress: Option<&ProgressHook>,
) -> Result<SearchOutput, SolveError> {
    if groups.is_empty() {
        // zero groups: exactly one way to choose nothing
        return Ok(match kind {
            ReturnKind::Count => SearchOutput::Count(1),
            ReturnKind::CombinedMasks => SearchOutput::Masks(vec![EMPTY]),
            ReturnKind::Indices => SearchOutput::Indices(vec![Vec::new()]),
        });
    }

    let first = &groups[0];
    let rest = &groups[1..];
    let total = first.len();
    debug!(groups = groups.len(), tasks = total, parallel, "dispatching root fan-out");

    let completed = AtomicUsize::new(0);
    let run_task = |idx: usize| -> SearchOutput {
        let searcher = Searcher::new(rest, cancel);
        let root = first.mask_at(idx);
        let (root_hi, root_lo) = (root.hi, root.lo);
        let partial = match kind {
            ReturnKind::Count => SearchOutput::Count(searcher.count(0, root_hi, root_lo)),
            ReturnKind::CombinedMasks => {
                let mut masks = Vec::new();
                searcher.collect_masks(0, root_hi, root_lo, &mut masks);
                SearchOutput::Masks(masks)
            }
            ReturnKind::Indices => {
                let mut path: ArrayVec<u32, MAX_GROUPS> = ArrayVec::new();
                path.push(idx as u32);
                let mut paths = Vec::new();
                searcher.collect_indices(0, root_hi, root_lo, &mut path, &mut paths);
                SearchOutput::Indices(paths)
            }
        };
        if let Some(hook) = progress {
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            hook(done, total);
        }
        partial
    };

    let partials: Vec<SearchOutput> = if parallel {
        (0..total).into_par_iter().map(run_task).collect()
    } else {
        (0..total).map(run_task).collect()
    };

    if cancel.is_cancelled() {
        return Err(SolveError::Cancelled);
    }

    aggregate(kind, partials)
}

fn aggregate(kind: ReturnKind, partials: Vec<SearchOutput>) -> Result<SearchOutput, SolveError> {
    match kind {
        ReturnKind::Count => {
            let mut count = 0u64;
            for partial in partials {
                match partial {
                    SearchOutput::Count(n) => count += n,
                    _ => return Err(SolveError::Internal("worker returned mismatched result kind")),
                }
            }
            Ok(SearchOutput::Count(count))
        }
        ReturnKind::CombinedMasks => {
            let mut masks = Vec::new();
            for partial in partials {
                match partial {
                    SearchOutput::Masks(m) => masks.extend(m),
                    _ => return Err(SolveError::Internal("worker returned mismatched result kind")),
                }
            }
            Ok(SearchOutput::Masks(masks))
        }
        ReturnKind::Indices => {
            let mut paths = Vec::new();
            for partial in partials {
                match partial {
                    SearchOutput::Indices(p) => paths.extend(p),
                    _ => return Err(SolveError::Internal("worker returned mismatched result kind")),
                }
            }
            Ok(SearchOutput::Indices(paths))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(groups: &[&[u128]]) -> Vec<GroupColumns> {
        groups
            .iter()
            .map(|masks| {
                let masks: Vec<Mask> = masks.iter().map(|&m| Mask::from_u128(m)).collect();
                GroupColumns::from_masks(&masks)
            })
            .collect()
    }

    fn count_of(output: SearchOutput) -> u64 {
        match output {
            SearchOutput::Count(n) => n,
            _ => panic!("expected count output"),
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let groups = columns(&[
            &[0b000011, 0b001100, 0b110000],
            &[0b000001, 0b000010, 0b010000],
            &[0b000100, 0b001000, 0b100000],
        ]);
        let cancel = CancelToken::new();
        let seq = count_of(run(&groups, ReturnKind::Count, false, &cancel, None).unwrap());
        let par = count_of(run(&groups, ReturnKind::Count, true, &cancel, None).unwrap());
        assert_eq!(seq, par);
    }

    #[test]
    fn test_enumeration_order_is_deterministic() {
        let groups = columns(&[&[0b01, 0b10], &[0b01, 0b10]]);
        let cancel = CancelToken::new();
        let par = run(&groups, ReturnKind::Indices, true, &cancel, None).unwrap();
        match par {
            SearchOutput::Indices(paths) => assert_eq!(paths, vec![vec![0, 1], vec![1, 0]]),
            _ => panic!("expected indices output"),
        }
    }

    #[test]
    fn test_no_groups_single_empty_leaf() {
        let cancel = CancelToken::new();
        assert_eq!(count_of(run(&[], ReturnKind::Count, true, &cancel, None).unwrap()), 1);
        match run(&[], ReturnKind::Indices, true, &cancel, None).unwrap() {
            SearchOutput::Indices(paths) => assert_eq!(paths, vec![Vec::<u32>::new()]),
            _ => panic!("expected indices output"),
        }
    }

    #[test]
    fn test_cancelled_run_is_an_error() {
        let groups = columns(&[&[0b01, 0b10], &[0b01, 0b10]]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            run(&groups, ReturnKind::Count, true, &cancel, None),
            Err(SolveError::Cancelled)
        ));
    }

    #[test]
    fn test_progress_reaches_total() {
        let groups = columns(&[&[0b001, 0b010, 0b100], &[0b001, 0b010, 0b100]]);
        let cancel = CancelToken::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let last = Arc::clone(&seen);
        let hook: ProgressHook = Arc::new(move |done, total| {
            assert!(done <= total);
            last.fetch_max(done, Ordering::Relaxed);
        });
        run(&groups, ReturnKind::Count, true, &cancel, Some(&hook)).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_watchdog_fires_and_disarms() {
        let cancel = CancelToken::new();
        let watchdog = Watchdog::arm(&cancel, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(50));
        assert!(cancel.is_cancelled());

        let cancel = CancelToken::new();
        let watchdog2 = Watchdog::arm(&cancel, Duration::from_millis(20));
        watchdog2.disarm();
        thread::sleep(Duration::from_millis(60));
        assert!(!cancel.is_cancelled());
        drop(watchdog);
    }
}
