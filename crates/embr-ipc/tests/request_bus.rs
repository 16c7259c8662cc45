//! Request/response over a depth-1 queue with per-request reply slots.

#![cfg(not(loom))]

use std::thread;
use std::time::Duration;

use embr_ipc::{queue, reply_pair, BusError, QueueReceiver, Reply, RequestToken};
use serial_test::serial;

/// Echo request: the server replies with `value * 10` after `work`.
struct Echo {
    value: u32,
    work: Duration,
    reply: Reply<u32>,
}

fn spawn_server(rx: QueueReceiver<Echo>, requests: usize) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut served = 0;
        while served < requests {
            match rx.try_receive() {
                Some(req) => {
                    thread::sleep(req.work);
                    req.reply.publish(req.value * 10);
                    served += 1;
                }
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
    })
}

#[test]
#[serial]
fn test_timed_out_call_does_not_leak_into_next_call() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tx, rx) = queue::<Echo>(1);
    let server = spawn_server(rx, 2);

    let (reply, slow) = reply_pair(RequestToken::next());
    tx.send(
        Echo {
            value: 1,
            work: Duration::from_millis(80),
            reply,
        },
        Duration::from_millis(10),
    )
    .unwrap();
    assert_eq!(
        slow.await_result(Duration::from_millis(10)),
        Err(BusError::TimedOut)
    );

    // Wait for the queue to drain, the first request is still being served.
    let (reply, fast) = reply_pair(RequestToken::next());
    tx.send(
        Echo {
            value: 2,
            work: Duration::ZERO,
            reply,
        },
        Duration::from_millis(200),
    )
    .expect("server never drained the queue");
    assert_eq!(fast.await_result(Duration::from_secs(2)), Ok(20));

    server.join().unwrap();
}

#[test]
#[serial]
fn test_second_sender_sees_queue_full_while_first_pending() {
    let (tx, rx) = queue::<Echo>(1);

    let (first_reply, _first) = reply_pair(RequestToken::next());
    tx.send(
        Echo {
            value: 1,
            work: Duration::ZERO,
            reply: first_reply,
        },
        Duration::ZERO,
    )
    .unwrap();

    let (second_reply, second) = reply_pair(RequestToken::next());
    let result = tx.send(
        Echo {
            value: 2,
            work: Duration::ZERO,
            reply: second_reply,
        },
        Duration::from_millis(10),
    );
    assert_eq!(result, Err(BusError::QueueFull));
    // The rejected request's reply was dropped with it.
    assert_eq!(
        second.await_result(Duration::from_millis(10)),
        Err(BusError::Abandoned)
    );

    assert!(rx.try_receive().is_some());
}

#[test]
#[serial]
fn test_results_follow_their_tokens() {
    let (tx, rx) = queue::<Echo>(1);
    let server = spawn_server(rx, 3);

    for value in 1..=3u32 {
        let token = RequestToken::next();
        let (reply, pending) = reply_pair(token);
        assert_eq!(pending.token(), token);
        tx.send(
            Echo {
                value,
                work: Duration::from_millis(1),
                reply,
            },
            Duration::from_millis(500),
        )
        .unwrap();
        assert_eq!(pending.await_result(Duration::from_secs(2)), Ok(value * 10));
    }

    server.join().unwrap();
}
