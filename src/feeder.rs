/*
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Consumes one or more streams of atoms in parallel and issues `Add`/`Relate`
//! against a [`WriteChain`].
//!
//! Grounded on the teacher's `crossbeam-channel` dependency: rather than a
//! `rayon` data-parallel map (the wrong tool for N independent,
//! blocking-on-I/O producers with early-cancellation semantics), each
//! stream gets its own OS thread via [`std::thread::scope`], and a
//! `crossbeam_channel::bounded(1)` channel collects the first error while a
//! shared `AtomicBool` tells every other worker to stop pulling from its
//! stream.

use crate::atom::Atom;
use crate::error::Result;
use crate::traits::WriteChain;
use std::sync::atomic::{AtomicBool, Ordering};

/// Feed `streams` into `chain` in parallel.
///
/// For each stream, the first atom is added without creating a transition;
/// every subsequent atom is added and `relate(previous, current, 1)` is
/// issued. `feed` blocks until every stream has exited. If any stream's
/// iterator or any `add`/`relate` call errors, that error is returned, the
/// remaining streams are signalled to stop before their next pull, and
/// their unread input is left unread.
pub fn feed<C, I, S>(chain: &C, streams: Vec<S>) -> Result<()>
where
    C: WriteChain,
    I: Iterator<Item = Atom>,
    S: IntoIterator<IntoIter = I> + Send,
{
    let cancelled = AtomicBool::new(false);
    let (error_tx, error_rx) = crossbeam_channel::bounded::<crate::error::StoreError>(1);

    std::thread::scope(|scope| {
        for stream in streams {
            let cancelled = &cancelled;
            let error_tx = error_tx.clone();
            scope.spawn(move || {
                if let Err(e) = feed_one(chain, stream.into_iter(), cancelled) {
                    cancelled.store(true, Ordering::SeqCst);
                    // A full channel means another worker already reported
                    // the first error; ours is discarded, per spec §4.8.
                    let _ = error_tx.try_send(e);
                }
            });
        }
    });
    drop(error_tx);

    match error_rx.try_recv() {
        Ok(e) => Err(e),
        Err(_) => Ok(()),
    }
}

fn feed_one<C: WriteChain>(
    chain: &C,
    mut stream: impl Iterator<Item = Atom>,
    cancelled: &AtomicBool,
) -> Result<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Ok(());
    }
    let Some(first) = stream.next() else {
        return Ok(());
    };
    let mut previous = chain.add(first)?;

    for atom in stream {
        if cancelled.load(Ordering::SeqCst) {
            return Ok(());
        }
        let current = chain.add(atom)?;
        chain.relate(previous, current, 1)?;
        previous = current;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::stores::MemoryChain;
    use crate::traits::ReadChain;

    #[test]
    fn feeds_single_stream_and_builds_expected_links() {
        let chain = MemoryChain::new();
        let stream: Vec<Atom> = [" ", "a", "b", "a", "b"]
            .iter()
            .map(|s| Atom::Str(s.to_string()))
            .collect();
        feed(&chain, vec![stream]).unwrap();

        let space = chain.find(&Atom::Str(" ".into())).unwrap();
        let a = chain.find(&Atom::Str("a".into())).unwrap();
        let b = chain.find(&Atom::Str("b".into())).unwrap();

        assert_eq!(chain.raw_links(space).unwrap(), vec![(a, 1)]);
        assert_eq!(chain.raw_links(a).unwrap(), vec![(b, 2)]);
        assert_eq!(chain.raw_links(b).unwrap(), vec![(a, 1)]);
    }

    #[test]
    fn first_error_is_returned_and_chain_has_at_most_the_prefix() {
        let chain = MemoryChain::new();
        let stream: Vec<Atom> = (0..10).map(Atom::U64).collect();
        let cancelled = AtomicBool::new(false);
        feed_one(&chain, stream.into_iter(), &cancelled).unwrap();
        assert_eq!(chain.len(), 10);

        // Drive `feed` end to end against a stream whose relate overflows,
        // to exercise first-error propagation through the public API.
        let overflow_chain = MemoryChain::new();
        let a = overflow_chain.add(Atom::U64(0)).unwrap();
        let b = overflow_chain.add(Atom::U64(1)).unwrap();
        overflow_chain.relate(a, b, u32::MAX).unwrap();
        let bad_stream = vec![Atom::U64(0), Atom::U64(1)];
        let err = feed(&overflow_chain, vec![bad_stream]).unwrap_err();
        assert!(matches!(err, StoreError::CountOverflow { .. }));
    }

    #[test]
    fn multiple_streams_feed_concurrently() {
        let chain = MemoryChain::new();
        let streams: Vec<Vec<Atom>> = (0..4)
            .map(|i| vec![Atom::U64(i), Atom::U64(i), Atom::U64(i + 100)])
            .collect();
        feed(&chain, streams).unwrap();
        for i in 0..4u64 {
            let id = chain.find(&Atom::U64(i)).unwrap();
            // self-loop relate(i, i, 1) then relate(i, i+100, 1)
            let links = chain.raw_links(id).unwrap();
            assert_eq!(links.len(), 2);
        }
    }
}
