use std::time::{Duration, Instant};
use weft::io::{self, Operation, Ticket, Transfer};
use weft::{Scheduler, Task, TaskState};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Completes as soon as it is started: the signal is already set when the
/// task parks, so every suspension costs exactly one tick.
struct Immediate;

impl Operation for Immediate {
    type Output = ();

    fn name(&self) -> &'static str {
        "immediate"
    }

    fn initiate(&mut self, ticket: Ticket) -> std::io::Result<()> {
        ticket.complete(Ok(Transfer::empty()));
        Ok(())
    }

    fn finish(self, _transfer: Transfer) -> weft::Result<()> {
        Ok(())
    }
}

fn suspend() -> Task<()> {
    io::submit(Immediate)
}

fn suspending(times: usize) -> Task<usize> {
    Task::new(async move {
        for _ in 0..times {
            suspend().await?;
        }
        Ok(times)
    })
}

#[test]
fn test_end_to_end_two_roots() {
    init();

    let mut builder = Scheduler::builder();

    let answer = builder.spawn(Task::new(async {
        suspend().await?;
        Ok(42)
    }));
    let ready = builder.spawn(Task::new(async { Ok("ready") }));

    let mut scheduler = builder.build().unwrap();

    assert!(ready.is_done());
    assert_eq!(ready.get_result().unwrap(), "ready");
    assert_eq!(answer.state(), TaskState::Suspended);

    scheduler.run().unwrap();

    assert_eq!(scheduler.ticks(), 1);
    assert_eq!(answer.get_result().unwrap(), 42);
}

#[test]
fn test_k_suspensions_take_k_ticks() {
    init();

    let (mut scheduler, handles) = Scheduler::new([suspending(5)]).unwrap();

    scheduler.run().unwrap();

    assert_eq!(scheduler.ticks(), 5);
    assert_eq!(handles[0].get_result().unwrap(), 5);
}

#[test]
fn test_root_without_suspension_needs_no_tick() {
    init();

    let (mut scheduler, handles) = Scheduler::new([suspending(0)]).unwrap();

    assert!(scheduler.done());
    scheduler.run().unwrap();

    assert_eq!(scheduler.ticks(), 0);
    assert_eq!(handles[0].get_result().unwrap(), 0);
}

#[test]
fn test_coalesced_roots_take_max_ticks() {
    init();

    let counts = [1, 3, 5, 2];
    let (mut scheduler, handles) = Scheduler::new(counts.map(suspending)).unwrap();

    scheduler.run().unwrap();

    assert_eq!(scheduler.ticks(), 5);
    for (handle, count) in handles.iter().zip(counts) {
        assert_eq!(handle.get_result().unwrap(), count);
    }
}

#[test]
fn test_sleeping_roots_tick_between_max_and_sum() {
    init();

    let sleeper = |times: usize| {
        Task::new(async move {
            for _ in 0..times {
                weft::time::sleep(Duration::from_millis(2)).await?;
            }
            Ok(times)
        })
    };

    let (mut scheduler, handles) = Scheduler::new([sleeper(2), sleeper(3)]).unwrap();

    scheduler.run().unwrap();

    let ticks = scheduler.ticks();
    assert!((3..=5).contains(&ticks), "unexpected tick count {ticks}");
    assert_eq!(handles[0].get_result().unwrap(), 2);
    assert_eq!(handles[1].get_result().unwrap(), 3);
}

#[test]
fn test_wait_any_zero_timeout_does_not_block() {
    init();

    let (mut scheduler, handles) = Scheduler::new([Task::new(async {
        io::signaled().await;
        Ok(())
    })])
    .unwrap();

    let start = Instant::now();
    assert_eq!(scheduler.wait_any(Some(Duration::ZERO)).unwrap(), None);
    assert!(start.elapsed() < Duration::from_secs(1));

    assert_eq!(scheduler.step().unwrap(), 0);
    assert!(!scheduler.done());

    scheduler.environment(0).unwrap().signal().set().unwrap();

    assert_eq!(scheduler.wait_any(Some(Duration::ZERO)).unwrap(), Some(0));
    assert_eq!(scheduler.step().unwrap(), 1);
    assert!(scheduler.done());
    handles[0].get_result().unwrap();
}

#[test]
fn test_wait_any_times_out() {
    init();

    let (mut scheduler, _handles) = Scheduler::new([Task::new(async {
        io::signaled().await;
        Ok(())
    })])
    .unwrap();

    let start = Instant::now();
    assert_eq!(
        scheduler.wait_any(Some(Duration::from_millis(20))).unwrap(),
        None
    );
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_wait_any_skips_finished_environments() {
    init();

    let mut builder = Scheduler::builder();
    let _done = builder.spawn(Task::new(async { Ok(()) }));
    let parked = builder.spawn(Task::new(async {
        io::signaled().await;
        Ok(())
    }));

    let mut scheduler = builder.build().unwrap();
    assert_eq!(scheduler.len(), 2);

    scheduler.environment(1).unwrap().signal().set().unwrap();
    assert_eq!(scheduler.wait_any(None).unwrap(), Some(1));

    scheduler.step().unwrap();
    assert!(parked.is_done());

    // Nothing left to wait on.
    assert_eq!(scheduler.wait_any(None).unwrap(), None);
}

#[test]
fn test_environments_step_independently() {
    init();

    let (mut scheduler, handles) = Scheduler::new([
        Task::new(async {
            io::signaled().await;
            Ok(1)
        }),
        Task::new(async {
            io::signaled().await;
            Ok(2)
        }),
    ])
    .unwrap();

    scheduler.environment(1).unwrap().signal().set().unwrap();
    assert_eq!(scheduler.wait_any(None).unwrap(), Some(1));
    assert_eq!(scheduler.step().unwrap(), 1);

    assert!(!handles[0].is_done());
    assert_eq!(handles[1].get_result().unwrap(), 2);

    scheduler.environment(0).unwrap().signal().set().unwrap();
    scheduler.run().unwrap();

    assert_eq!(handles[0].get_result().unwrap(), 1);
}
