//! Loom tests for the reply slot and status cell protocols
//!
//! Built with `--cfg loom`, [`reply_pair`](crate::reply_pair),
//! [`CompletionSignal`](crate::CompletionSignal) and
//! [`status_channel`](crate::status_channel) sit on loom's primitives, so
//! these models drive the production types through every interleaving.
//!
//! # Running Loom Tests
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --package embr-ipc --lib --release -- --test-threads=1 loom
//! ```

#[cfg(all(test, loom))]
mod tests {
    use std::time::Duration;

    use loom::thread;

    use crate::{reply_pair, status_channel, BusError, RequestToken};

    const WAIT: Duration = Duration::from_secs(1);

    /// Test: A published result always reaches the waiting caller
    #[test]
    fn loom_publish_reaches_caller() {
        loom::model(|| {
            let (reply, pending) = reply_pair::<u32>(RequestToken::next());

            let server = thread::spawn(move || reply.publish(7));

            assert_eq!(pending.await_result(WAIT), Ok(7));
            server.join().unwrap();
        });
    }

    /// Test: A readiness check never runs ahead of the value
    #[test]
    fn loom_ready_implies_value() {
        loom::model(|| {
            let (reply, pending) = reply_pair::<u32>(RequestToken::next());

            let server = thread::spawn(move || reply.publish(7));

            if pending.is_ready() {
                assert_eq!(pending.await_result(Duration::ZERO), Ok(7));
            }
            server.join().unwrap();
        });
    }

    /// Test: A dropped reply wakes the caller with Abandoned
    #[test]
    fn loom_dropped_reply_is_abandoned() {
        loom::model(|| {
            let (reply, pending) = reply_pair::<u32>(RequestToken::next());

            let server = thread::spawn(move || drop(reply));

            assert_eq!(pending.await_result(WAIT), Err(BusError::Abandoned));
            server.join().unwrap();
        });
    }

    /// Test: Two callers with their own slots never see each other's result
    ///
    /// The first caller polls once and may give up while its result is
    /// still in flight; the second caller waits. The late result for the
    /// first request lands in the first slot only.
    #[test]
    fn loom_late_result_does_not_cross_callers() {
        loom::model(|| {
            let (first_reply, first) = reply_pair::<u32>(RequestToken::next());
            let (second_reply, second) = reply_pair::<u32>(RequestToken::next());

            let server = thread::spawn(move || {
                first_reply.publish(1);
                second_reply.publish(2);
            });

            let early = first.await_result(Duration::ZERO);
            assert!(early == Ok(1) || early == Err(BusError::TimedOut));
            assert_eq!(second.await_result(WAIT), Ok(2));
            server.join().unwrap();
        });
    }

    /// Test: Status snapshots are never torn
    #[test]
    fn loom_status_snapshot_not_torn() {
        loom::model(|| {
            let (writer, reader) = status_channel((false, 0u32));

            let t = thread::spawn(move || writer.set((true, 0x0a00_0001)));

            let snapshot = reader.snapshot();
            assert!(snapshot == (false, 0) || snapshot == (true, 0x0a00_0001));

            t.join().unwrap();
            assert_eq!(reader.snapshot(), (true, 0x0a00_0001));
        });
    }
}
