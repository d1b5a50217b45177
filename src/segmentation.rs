//! Segmentation Engine
//!
//! Classifies every sample as steady-state or as a member of a time-series
//! segment by walking the predecessor links declared in metadata.
//!
//! ## Algorithm
//!
//! 1. Gap breaking: links with `delta_t > delta_t_max` are cleared
//! 2. Reference check: every remaining `prev_condition` must name a known sample
//! 3. Adjacency: predecessor index + successor lists (metadata order)
//! 4. Traversal: iterative walk from each head with a visited set
//! 5. Cycle check: linked samples not reached from any head sit on a cycle
//!
//! ```text
//!   t0 ──10──> t10 ──20──> t30          (one segment: head, interior, tail)
//!   t30 ──500──> t530                   (gap > delta_t_max: link cleared)
//!   ss1                                 (degenerate segment: steady state)
//! ```

use crate::metadata::{FirstLast, SampleRecord};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Role of a sample after segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRole {
    /// No predecessor and no successor
    SteadyState,
    /// First sample of a series (successors only)
    SeriesHead,
    /// Predecessor and successors
    SeriesInterior,
    /// Last sample of a series (predecessor only)
    SeriesTail,
}

impl SampleRole {
    /// Whether the sample belongs to a multi-point series.
    #[must_use]
    pub const fn is_time_series(self) -> bool {
        !matches!(self, Self::SteadyState)
    }

    /// Whether the sample has a forward difference.
    #[must_use]
    pub const fn has_successor(self) -> bool {
        matches!(self, Self::SeriesHead | Self::SeriesInterior)
    }
}

/// A normalized record with its derived role and links.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSample {
    record: SampleRecord,
    role: SampleRole,
    predecessor: Option<usize>,
    successors: Vec<usize>,
}

impl ClassifiedSample {
    /// Record after gap breaking.
    #[must_use]
    pub const fn record(&self) -> &SampleRecord {
        &self.record
    }

    /// Condition key.
    #[must_use]
    pub fn condition_name(&self) -> &str {
        self.record.condition_name()
    }

    /// Derived role.
    #[must_use]
    pub const fn role(&self) -> SampleRole {
        self.role
    }

    /// Index of the predecessor in [`Segmentation::samples`].
    #[must_use]
    pub const fn predecessor(&self) -> Option<usize> {
        self.predecessor
    }

    /// Indices of successors in [`Segmentation::samples`], metadata order.
    #[must_use]
    pub fn successors(&self) -> &[usize] {
        &self.successors
    }
}

/// Maximal chain of linked samples, in traversal order (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    samples: Vec<usize>,
}

impl Segment {
    /// Sample indices, head first.
    #[must_use]
    pub fn samples(&self) -> &[usize] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; segments hold at least their head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether this is a single steady-state sample.
    #[must_use]
    pub fn is_steady_state(&self) -> bool {
        self.samples.len() == 1
    }
}

/// Result of segmentation, consumed by the assembler.
#[derive(Debug, Clone)]
pub struct Segmentation {
    samples: Vec<ClassifiedSample>,
    segments: Vec<Segment>,
    delta_t_min: f64,
}

impl Segmentation {
    /// Classified samples in metadata order.
    #[must_use]
    pub fn samples(&self) -> &[ClassifiedSample] {
        &self.samples
    }

    /// Segments, ordered by the metadata position of their heads.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Floor for time-difference denominators.
    #[must_use]
    pub const fn delta_t_min(&self) -> f64 {
        self.delta_t_min
    }

    /// Look up a sample by condition name.
    #[must_use]
    pub fn sample(&self, condition: &str) -> Option<&ClassifiedSample> {
        self.samples
            .iter()
            .find(|sample| sample.condition_name() == condition)
    }

    /// Number of samples with a given role.
    #[must_use]
    pub fn count(&self, role: SampleRole) -> usize {
        self.samples.iter().filter(|s| s.role == role).count()
    }
}

/// Classify normalized records into steady-state samples and series segments.
///
/// # Errors
///
/// Returns error if:
/// - A predecessor names an unknown condition ([`Error::DanglingPredecessor`])
/// - A linked sample has no time delta ([`Error::MissingTimeDelta`])
/// - Predecessor links form a cycle ([`Error::CyclicPredecessor`])
#[tracing::instrument(skip_all, fields(samples = records.len()))]
pub fn segment(
    mut records: Vec<SampleRecord>,
    delta_t_max: f64,
    delta_t_min: f64,
) -> Result<Segmentation> {
    break_gaps(&mut records, delta_t_max);

    let predecessors = resolve_predecessors(&records)?;
    let mut successors = vec![Vec::new(); records.len()];
    for (idx, pred) in predecessors.iter().enumerate() {
        if let Some(pred) = *pred {
            successors[pred].push(idx);
        }
    }

    let segments = walk_segments(&records, &predecessors, &successors)?;

    let samples: Vec<ClassifiedSample> = records
        .into_iter()
        .zip(predecessors)
        .zip(successors)
        .map(|((record, predecessor), successors)| {
            let role = match (predecessor.is_some(), successors.is_empty()) {
                (false, true) => SampleRole::SteadyState,
                (false, false) => SampleRole::SeriesHead,
                (true, false) => SampleRole::SeriesInterior,
                (true, true) => SampleRole::SeriesTail,
            };
            check_declared_flags(&record, role);
            ClassifiedSample {
                record,
                role,
                predecessor,
                successors,
            }
        })
        .collect();

    let segmentation = Segmentation {
        samples,
        segments,
        delta_t_min,
    };
    debug!(
        segments = segmentation.segments.len(),
        steady_state = segmentation.count(SampleRole::SteadyState),
        "segmentation complete"
    );
    Ok(segmentation)
}

/// Clear links whose gap exceeds `delta_t_max`.
fn break_gaps(records: &mut [SampleRecord], delta_t_max: f64) {
    for record in records.iter_mut() {
        if record.delta_t().is_some_and(|dt| dt > delta_t_max) {
            debug!(
                condition = record.condition_name(),
                prev = record.prev_condition(),
                delta_t = record.delta_t(),
                "breaking series link"
            );
            record.clear_predecessor();
        }
    }
}

/// Map each record's `prev_condition` to an index.
fn resolve_predecessors(records: &[SampleRecord]) -> Result<Vec<Option<usize>>> {
    let index: FxHashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.condition_name(), idx))
        .collect();

    let mut predecessors = Vec::with_capacity(records.len());
    let mut dangling = Vec::new();

    for record in records {
        let Some(prev) = record.prev_condition() else {
            predecessors.push(None);
            continue;
        };
        match index.get(prev) {
            Some(&idx) => {
                if record.delta_t().is_none() {
                    return Err(Error::MissingTimeDelta {
                        condition: record.condition_name().to_string(),
                    });
                }
                predecessors.push(Some(idx));
            }
            None => {
                if !dangling.iter().any(|name: &String| name == prev) {
                    dangling.push(prev.to_string());
                }
                predecessors.push(None);
            }
        }
    }

    if dangling.is_empty() {
        Ok(predecessors)
    } else {
        Err(Error::DanglingPredecessor {
            references: dangling,
        })
    }
}

/// Walk every chain from its head; fail on any sample left unreached.
fn walk_segments(
    records: &[SampleRecord],
    predecessors: &[Option<usize>],
    successors: &[Vec<usize>],
) -> Result<Vec<Segment>> {
    let mut visited = vec![false; records.len()];
    let mut segments = Vec::new();

    for head in (0..records.len()).filter(|&idx| predecessors[idx].is_none()) {
        let mut samples = Vec::new();
        let mut stack = vec![head];

        while let Some(node) = stack.pop() {
            if visited[node] {
                return Err(Error::CyclicPredecessor {
                    cycle: trace_cycle(node, records, predecessors),
                });
            }
            visited[node] = true;
            samples.push(node);
            stack.extend(successors[node].iter().rev());
        }

        segments.push(Segment { samples });
    }

    // Every node on a cycle has a predecessor, so no head reaches it.
    if let Some(start) = visited.iter().position(|seen| !seen) {
        return Err(Error::CyclicPredecessor {
            cycle: trace_cycle(start, records, predecessors),
        });
    }

    Ok(segments)
}

/// Follow predecessor links from `start` until a condition repeats.
fn trace_cycle(
    start: usize,
    records: &[SampleRecord],
    predecessors: &[Option<usize>],
) -> Vec<String> {
    let mut position: FxHashMap<usize, usize> = FxHashMap::default();
    let mut path = Vec::new();
    let mut node = start;

    let first = loop {
        if let Some(&pos) = position.get(&node) {
            break pos;
        }
        position.insert(node, path.len());
        path.push(node);
        match predecessors[node] {
            Some(pred) => node = pred,
            None => break 0,
        }
    };

    // Report in link direction: earliest -> latest
    path[first..]
        .iter()
        .rev()
        .map(|&idx| records[idx].condition_name().to_string())
        .collect()
}

/// Log declared flags that disagree with the derived role.
fn check_declared_flags(record: &SampleRecord, role: SampleRole) {
    if record.is_time_series() != role.is_time_series() {
        debug!(
            condition = record.condition_name(),
            declared = record.is_time_series(),
            ?role,
            "isTs overridden by segmentation"
        );
    }

    let expected = match role {
        SampleRole::SteadyState => FirstLast::Both,
        SampleRole::SeriesHead => FirstLast::First,
        SampleRole::SeriesInterior => FirstLast::Interior,
        SampleRole::SeriesTail => FirstLast::Last,
    };
    if let Some(declared) = record.is_first_last() {
        if declared != expected {
            debug!(
                condition = record.condition_name(),
                ?declared,
                ?role,
                "is1stLast overridden by segmentation"
            );
        }
    }
}
