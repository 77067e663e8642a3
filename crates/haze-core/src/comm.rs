//! Cross-process reduction of flat numeric buffers.
//!
//! The medium system merges per-rank partial results at two barriers:
//! after parallel state setup and after each radiation-field segment.
//! Both go through [`Communicator::sum_all`].
//!
//! Two implementations are provided:
//!
//! - [`SingleProcess`]: the trivial group of one; reduces are no-ops.
//! - [`ChannelCommunicator`]: ranks running as threads of one process,
//!   linked by `crossbeam-channel`. Rank 0 acts as the root: it gathers
//!   every contribution, sums them in rank order (so all ranks see a
//!   bit-identical result), and broadcasts the total.

use std::ops::Range;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::CommError;

/// A group of cooperating processes able to sum buffers element-wise.
pub trait Communicator: Send + Sync {
    /// Rank of this process within the group, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Replace `data` on every rank with the element-wise sum over all ranks.
    ///
    /// Every rank must call this the same number of times with buffers of
    /// the same length.
    fn sum_all(&self, data: &mut [f64]) -> Result<(), CommError>;

    /// True when more than one process takes part.
    fn is_multi_process(&self) -> bool {
        self.size() > 1
    }
}

/// Contiguous share of `0..count` assigned to `rank` out of `size`.
///
/// The first `count % size` ranks get one extra item.
pub fn partition(count: usize, rank: usize, size: usize) -> Range<usize> {
    let size = size.max(1);
    let chunk = count / size;
    let rem = count % size;
    let start = rank * chunk + rank.min(rem);
    let len = chunk + usize::from(rank < rem);
    start.min(count)..(start + len).min(count)
}

/// The trivial single-process group.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn sum_all(&self, _data: &mut [f64]) -> Result<(), CommError> {
        Ok(())
    }
}

/// Root-side channel ends, held only by rank 0.
struct RootLinks {
    inbox: Receiver<(usize, Vec<f64>)>,
    /// Result channels indexed by rank; slot 0 is unused.
    outboxes: Vec<Sender<Vec<f64>>>,
}

/// One rank of an in-process group built by [`ChannelCommunicator::group`].
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    to_root: Sender<(usize, Vec<f64>)>,
    from_root: Receiver<Vec<f64>>,
    root: Option<RootLinks>,
}

// Compile-time assertion: communicators are shared across worker threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<ChannelCommunicator>();
};

impl ChannelCommunicator {
    /// Create a fully connected group of `size` ranks.
    ///
    /// Element `r` of the returned vector is rank `r`; move each into its
    /// own thread.
    pub fn group(size: usize) -> Vec<ChannelCommunicator> {
        let size = size.max(1);
        let (to_root, inbox) = unbounded();
        let mut outboxes = Vec::with_capacity(size);
        let mut inboxes = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = unbounded();
            outboxes.push(tx);
            inboxes.push(rx);
        }
        let mut root = Some(RootLinks { inbox, outboxes });
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, from_root)| ChannelCommunicator {
                rank,
                size,
                to_root: to_root.clone(),
                from_root,
                root: if rank == 0 { root.take() } else { None },
            })
            .collect()
    }

    fn reduce_at_root(&self, links: &RootLinks, data: &mut [f64]) -> Result<(), CommError> {
        let mut contributions: Vec<Option<Vec<f64>>> = vec![None; self.size];
        for _ in 1..self.size {
            let (rank, buf) = links
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { rank: self.rank })?;
            contributions[rank] = Some(buf);
        }

        let mut failure = None;
        for (rank, buf) in contributions.iter().enumerate().skip(1) {
            let len = buf.as_ref().map_or(0, Vec::len);
            if len != data.len() && failure.is_none() {
                failure = Some(CommError::LengthMismatch {
                    rank,
                    expected: data.len(),
                    actual: len,
                });
            }
        }

        if failure.is_none() {
            for buf in contributions.iter().skip(1).flatten() {
                for (acc, x) in data.iter_mut().zip(buf) {
                    *acc += x;
                }
            }
        }

        // Always answer so that no peer blocks forever; an empty reply
        // signals failure.
        let reply: Vec<f64> = if failure.is_some() {
            Vec::new()
        } else {
            data.to_vec()
        };
        for outbox in links.outboxes.iter().skip(1) {
            outbox
                .send(reply.clone())
                .map_err(|_| CommError::Disconnected { rank: self.rank })?;
        }
        failure.map_or(Ok(()), Err)
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn sum_all(&self, data: &mut [f64]) -> Result<(), CommError> {
        if self.size == 1 {
            return Ok(());
        }
        if let Some(links) = &self.root {
            return self.reduce_at_root(links, data);
        }
        self.to_root
            .send((self.rank, data.to_vec()))
            .map_err(|_| CommError::Disconnected { rank: self.rank })?;
        let total = self
            .from_root
            .recv()
            .map_err(|_| CommError::Disconnected { rank: self.rank })?;
        if total.len() != data.len() {
            return Err(CommError::LengthMismatch {
                rank: self.rank,
                expected: data.len(),
                actual: total.len(),
            });
        }
        data.copy_from_slice(&total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn partition_covers_range_without_overlap() {
        let parts: Vec<Range<usize>> = (0..3).map(|r| partition(10, r, 3)).collect();
        assert_eq!(parts, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn partition_with_more_ranks_than_items() {
        let parts: Vec<Range<usize>> = (0..4).map(|r| partition(2, r, 4)).collect();
        assert_eq!(parts, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn single_process_is_identity() {
        let mut data = [1.0, 2.0];
        SingleProcess.sum_all(&mut data).unwrap();
        assert_eq!(data, [1.0, 2.0]);
        assert!(!SingleProcess.is_multi_process());
    }

    #[test]
    fn channel_group_sums_across_threads() {
        let handles: Vec<_> = ChannelCommunicator::group(4)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let r = comm.rank() as f64;
                    let mut data = vec![r, 1.0, 10.0 * r];
                    comm.sum_all(&mut data).unwrap();
                    // second round to check channel ordering
                    let mut again = vec![1.0];
                    comm.sum_all(&mut again).unwrap();
                    (data, again)
                })
            })
            .collect();
        for h in handles {
            let (data, again) = h.join().unwrap();
            assert_eq!(data, vec![6.0, 4.0, 60.0]);
            assert_eq!(again, vec![4.0]);
        }
    }

    #[test]
    fn length_mismatch_reported_on_every_rank() {
        let handles: Vec<_> = ChannelCommunicator::group(2)
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut data = vec![0.0; 2 + comm.rank()];
                    comm.sum_all(&mut data)
                })
            })
            .collect();
        for h in handles {
            assert!(matches!(
                h.join().unwrap(),
                Err(CommError::LengthMismatch { .. })
            ));
        }
    }
}
