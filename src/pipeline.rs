//! Splits a species advance across worker pipelines and merges their movers.

use std::ops::Range;
use std::sync::Arc;
use std::thread;

use itertools::izip;
use ndarray::Axis;
use rayon::prelude::*;
use serde::Deserialize;

use crate::accumulator::AccumulatorArray;
use crate::advance::{advance_particle, Coefficients};
use crate::grid::Grid;
use crate::interpolator::InterpolatorArray;
use crate::mover::BoundaryMover;
use crate::particle::{Particle, ParticleMover};
use crate::species::Species;
use crate::{PicError, MAX_PIPELINE, MOVER_BLOCK, PARTICLE_BLOCK};

/// How partitions are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// One after another on the calling thread.
    #[default]
    Serial,
    /// On a dedicated rayon pool.
    Rayon,
    /// One scoped thread per pipeline, the host partition on the calling thread.
    Threads,
}

/// What to do when a pipeline has more movers than storage reserved for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the movers, log a warning and keep going. The dropped particles
    /// miss the rest of their motion for this step.
    #[default]
    Degrade,
    /// Return [PicError::MoverOverflow] after the movers have been merged.
    FailFast,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker pipelines, not counting the host.
    pub n_pipeline: usize,
    #[serde(default)]
    pub dispatch: Dispatch,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

/// Share of `n` items that `rank` out of `n_pipeline` pipelines gets, in whole blocks.
///
/// Pipelines split the `block * floor(n / block)` leading items as evenly as
/// whole blocks allow. `rank == n_pipeline` is the host, which gets the
/// `n % block` trailing items.
pub fn distribute(n: usize, block: usize, rank: usize, n_pipeline: usize) -> Range<usize> {
    if rank == n_pipeline {
        let len = n % block;
        return n - len..n;
    }
    let t = (n / block) as f64 / n_pipeline as f64;
    let start = block * (t * rank as f64 + 0.5) as usize;
    let end = block * (t * (rank + 1) as f64 + 0.5) as usize;
    start..end
}

/// Work assigned to one pipeline or to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// `0..n_pipeline` for workers, `n_pipeline` for the host.
    pub rank: usize,
    pub particles: Range<usize>,
    /// Mover slots reserved for this partition.
    pub movers: Range<usize>,
    /// Accumulator replica to deposit into.
    pub accumulator: usize,
}

/// Plan a step for `np` particles and `max_nm` mover slots.
///
/// Workers come first in rank order, the host last. Particle and mover ranges
/// are contiguous and cover `0..np` and `0..max_nm`. Pipelines reserve movers in
/// multiples of [MOVER_BLOCK]; the host gets the remainder, which is at least
/// one slot per host particle whenever `max_nm` allows it.
pub fn partition(np: usize, max_nm: usize, n_pipeline: usize) -> Vec<Partition> {
    let reserved = max_nm.saturating_sub(np % PARTICLE_BLOCK);
    (0..=n_pipeline)
        .map(|rank| {
            let host = rank == n_pipeline;
            let mut movers = distribute(reserved, MOVER_BLOCK, rank, n_pipeline);
            if host {
                movers.end = max_nm;
            }
            Partition {
                rank,
                particles: distribute(np, PARTICLE_BLOCK, rank, n_pipeline),
                movers,
                accumulator: if host { 0 } else { 1 + rank },
            }
        })
        .collect()
}

/// Outcome of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    pub rank: usize,
    /// Where this partition's movers were written before merging.
    pub movers_start: usize,
    pub max_nm: usize,
    pub nm: usize,
    /// Movers that did not fit into `max_nm`.
    pub n_ignored: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Movers queued on the species.
    pub nm: usize,
    /// Per partition, in merge order.
    pub segments: Vec<SegmentReport>,
}

impl AdvanceReport {
    pub fn n_ignored(&self) -> usize {
        self.segments.iter().map(|s| s.n_ignored).sum()
    }
}

/// Everything a partition needs besides its own particles and movers.
struct Kernel<'a, M> {
    interpolators: &'a InterpolatorArray,
    accumulators: &'a AccumulatorArray,
    grid: &'a Grid,
    k: Coefficients,
    mover: &'a M,
}

impl<M: BoundaryMover> Kernel<'_, M> {
    fn run(
        &self,
        part: &Partition,
        particles: &mut [Particle],
        movers: &mut [ParticleMover],
    ) -> SegmentReport {
        let a = self.accumulators.replica(part.accumulator);
        let max_nm = movers.len();
        let mut nm = 0;
        let mut n_ignored = 0;

        for (n, p) in particles.iter_mut().enumerate() {
            let cell = p.i;
            let Some([dispx, dispy, dispz]) = advance_particle(
                p,
                &self.interpolators[cell],
                &self.k,
                &a.index_axis(Axis(0), cell),
            ) else {
                continue;
            };
            let mut pm = ParticleMover {
                dispx,
                dispy,
                dispz,
                i: part.particles.start + n,
            };
            if self.mover.move_p(p, &mut pm, a.view(), self.grid, self.k.qsp) {
                if nm < max_nm {
                    movers[nm] = pm;
                    nm += 1;
                } else {
                    n_ignored += 1;
                }
            }
        }

        SegmentReport {
            rank: part.rank,
            movers_start: part.movers.start,
            max_nm,
            nm,
            n_ignored,
        }
    }
}

/// Cut `slice` into consecutive pieces of the given lengths.
fn split_lengths<T>(mut slice: &mut [T], lengths: impl IntoIterator<Item = usize>) -> Vec<&mut [T]> {
    let mut pieces = Vec::new();
    for len in lengths {
        let (head, tail) = std::mem::take(&mut slice).split_at_mut(len);
        pieces.push(head);
        slice = tail;
    }
    pieces
}

/// Fork-join executor for species advances.
#[derive(Debug)]
pub struct Pipelines {
    n_pipeline: usize,
    dispatch: Dispatch,
    overflow: OverflowPolicy,
    pool: Option<rayon::ThreadPool>,
}

impl Pipelines {
    pub fn new(config: &PipelineConfig) -> Result<Self, PicError> {
        let n_pipeline = config.n_pipeline;
        if n_pipeline == 0 || n_pipeline > MAX_PIPELINE {
            return Err(PicError::InvalidPipelineCount {
                requested: n_pipeline,
                max: MAX_PIPELINE,
            });
        }
        let pool = match config.dispatch {
            Dispatch::Rayon => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n_pipeline + 1)
                    .thread_name(|i| format!("pipeline-{i}"))
                    .build()
                    .map_err(|e| PicError::ThreadPool(e.to_string()))?,
            ),
            Dispatch::Serial | Dispatch::Threads => None,
        };
        Ok(Self {
            n_pipeline,
            dispatch: config.dispatch,
            overflow: config.overflow,
            pool,
        })
    }

    pub fn n_pipeline(&self) -> usize {
        self.n_pipeline
    }

    /// Advance every particle of `sp` by one step.
    ///
    /// Currents go into `aa`, one replica per partition. Particles leaving their
    /// cell are handed to `mover`; those it cannot finish are queued on the
    /// species as movers, compacted in partition order.
    pub fn advance_p<M: BoundaryMover>(
        &self,
        sp: &mut Species,
        aa: &AccumulatorArray,
        ia: &InterpolatorArray,
        mover: &M,
    ) -> Result<AdvanceReport, PicError> {
        if !Arc::ptr_eq(&sp.grid, &aa.grid) {
            return Err(PicError::GridMismatch("accumulator array"));
        }
        if !Arc::ptr_eq(&sp.grid, &ia.grid) {
            return Err(PicError::GridMismatch("interpolator array"));
        }
        if aa.n_replicas() < self.n_pipeline + 1 {
            return Err(PicError::ReplicaCount {
                expected: self.n_pipeline + 1,
                actual: aa.n_replicas(),
            });
        }

        let grid = Arc::clone(&sp.grid);
        let kernel = Kernel {
            interpolators: ia,
            accumulators: aa,
            grid: &grid,
            k: Coefficients::new(sp, &grid),
            mover,
        };
        let partitions = partition(sp.np(), sp.max_nm(), self.n_pipeline);
        log::debug!(
            "advancing {} {} particles on {} pipelines: {:?}",
            sp.np(),
            sp.name,
            self.n_pipeline,
            partitions
        );

        sp.offsets_current = false;
        let particles = split_lengths(&mut sp.particles, partitions.iter().map(|p| p.particles.len()));
        let movers = split_lengths(&mut sp.movers, partitions.iter().map(|p| p.movers.len()));
        let work: Vec<_> = izip!(&partitions, particles, movers).collect();

        let segments: Vec<SegmentReport> = match self.dispatch {
            Dispatch::Serial => work
                .into_iter()
                .map(|(part, ps, ms)| kernel.run(part, ps, ms))
                .collect(),
            Dispatch::Rayon => {
                let pool = self
                    .pool
                    .as_ref()
                    .ok_or_else(|| PicError::ThreadPool("rayon pool missing".into()))?;
                pool.install(|| {
                    work.into_par_iter()
                        .map(|(part, ps, ms)| kernel.run(part, ps, ms))
                        .collect()
                })
            }
            Dispatch::Threads => run_threads(&kernel, work)?,
        };

        let nm = merge_movers(sp, &segments);
        let report = AdvanceReport { nm, segments };
        if self.overflow == OverflowPolicy::FailFast {
            if let Some(seg) = report.segments.iter().find(|s| s.n_ignored > 0) {
                return Err(PicError::MoverOverflow {
                    rank: seg.rank,
                    ignored: seg.n_ignored,
                });
            }
        }
        Ok(report)
    }
}

type Work<'a> = (&'a Partition, &'a mut [Particle], &'a mut [ParticleMover]);

/// Spawn the pipelines, run the host partition here, then wait for everyone.
fn run_threads<M: BoundaryMover>(
    kernel: &Kernel<'_, M>,
    mut work: Vec<Work<'_>>,
) -> Result<Vec<SegmentReport>, PicError> {
    let host = work.pop();
    thread::scope(|s| {
        let handles: Vec<_> = work
            .into_iter()
            .map(|(part, ps, ms)| (part.rank, s.spawn(move || kernel.run(part, ps, ms))))
            .collect();
        let host_report = host.map(|(part, ps, ms)| kernel.run(part, ps, ms));

        let joined: Vec<_> = handles
            .into_iter()
            .map(|(rank, handle)| handle.join().map_err(|_| PicError::WorkerPanicked { rank }))
            .collect();
        let mut reports = joined.into_iter().collect::<Result<Vec<_>, _>>()?;
        reports.extend(host_report);
        Ok(reports)
    })
}

/// Close the gaps between partition mover segments. Returns the mover count.
fn merge_movers(sp: &mut Species, segments: &[SegmentReport]) -> usize {
    let mut nm = 0;
    for seg in segments {
        if seg.n_ignored > 0 {
            log::warn!(
                "pipeline {} ran out of storage for {} movers",
                seg.rank,
                seg.n_ignored
            );
        }
        if seg.movers_start != nm {
            sp.movers
                .copy_within(seg.movers_start..seg.movers_start + seg.nm, nm);
        }
        nm += seg.nm;
    }
    sp.nm = nm;
    nm
}
