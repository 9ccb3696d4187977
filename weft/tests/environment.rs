use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Waker};
use std::time::Duration;

use weft::{Environment, Error, Task, TaskId, TaskState, io, task};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parked<T: 'static>(value: T) -> Task<T> {
    Task::new(async move {
        io::signaled().await;
        Ok(value)
    })
}

/// Sets the signal and steps once.
fn fire(env: &Environment) -> bool {
    env.signal().set().unwrap();
    env.step().unwrap()
}

#[test]
fn test_leaf_moves_through_nested_tasks() {
    init();

    let seen: Rc<RefCell<Vec<TaskId>>> = Rc::default();
    let record = {
        let seen = seen.clone();
        move || seen.borrow_mut().push(task::current_leaf().unwrap())
    };

    let root = {
        let record = record.clone();
        Task::new(async move {
            record();

            let record_b = record.clone();
            Task::new(async move {
                record_b();
                io::signaled().await;
                Ok(())
            })
            .await?;

            record();

            let record_c = record.clone();
            Task::new(async move {
                record_c();
                io::signaled().await;
                Ok(())
            })
            .await?;

            record();
            Ok(())
        })
    };

    let env = Environment::new().unwrap();
    let handle = env.attach(root);
    let root_id = handle.id().unwrap();

    let b = env.current().unwrap();
    assert_ne!(b, root_id);
    assert_eq!(*seen.borrow(), [root_id, b]);

    assert!(fire(&env));

    let c = env.current().unwrap();
    assert_ne!(c, root_id);
    assert_eq!(*seen.borrow(), [root_id, b, root_id, c]);

    assert!(fire(&env));

    assert_eq!(env.current(), None);
    assert!(env.done());
    assert_eq!(*seen.borrow(), [root_id, b, root_id, c, root_id]);
    handle.get_result().unwrap();
}

#[test]
fn test_leaf_is_innermost_of_three() {
    init();

    let innermost = Rc::new(Cell::new(None));
    let observed = innermost.clone();

    let root = Task::new(async move {
        let mid = Task::new(async move {
            let leaf = Task::new(async move {
                observed.set(task::current());
                assert_eq!(task::current(), task::current_leaf());

                io::signaled().await;
                Ok(3)
            });

            Ok(leaf.await? * 2)
        });

        Ok(mid.await? + 1)
    });

    let env = Environment::new().unwrap();
    let handle = env.attach(root);

    let leaf = innermost.get().unwrap();
    assert_eq!(env.current(), Some(leaf));
    assert_eq!(env.task_count(), 3);
    assert_eq!(env.state_of(leaf), Some(TaskState::Suspended));
    assert_eq!(handle.state(), TaskState::Suspended);

    assert!(fire(&env));

    assert!(env.done());
    assert_eq!(env.task_count(), 1);
    assert_eq!(handle.get_result().unwrap(), 7);
}

#[test]
fn test_nested_task_finishing_inline_continues_parent() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(Task::new(async {
        let child = Task::new(async { Ok(20) });
        Ok(child.await? + 22)
    }));

    assert!(env.done());
    assert_eq!(handle.get_result().unwrap(), 42);
}

#[test]
#[should_panic(expected = "nonlinear use")]
fn test_nonlinear_use_panics() {
    init();

    let env = Environment::new().unwrap();
    let _handle = env.attach(parked(()));

    env.update_current(None, None);
}

#[test]
#[should_panic(expected = "has not finished")]
fn test_get_result_before_done_panics() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(parked(1));

    let _ = handle.get_result();
}

#[test]
#[should_panic(expected = "already taken")]
fn test_result_is_consumed_once() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(Task::new(async { Ok(1) }));

    assert_eq!(handle.get_result().unwrap(), 1);
    let _ = handle.get_result();
}

#[test]
#[should_panic(expected = "already has a task chain")]
fn test_second_attach_panics() {
    init();

    let env = Environment::new().unwrap();
    let _first = env.attach(parked(1));
    let _second = env.attach(parked(2));
}

#[test]
#[should_panic(expected = "from inside another task")]
fn test_awaiting_outside_a_task_panics() {
    let mut task = Task::new(async { Ok(1) });
    let mut cx = Context::from_waker(Waker::noop());

    let _ = Pin::new(&mut task).poll(&mut cx);
}

#[test]
fn test_error_propagates_through_await() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(Task::new(async {
        let nested = Task::<()>::new(async {
            io::signaled().await;
            Err(Error::other("boom"))
        });

        nested.await?;
        Ok("not reached")
    }));

    assert!(fire(&env));

    assert_eq!(handle.state(), TaskState::Done(task::Outcome::Error));
    let err = handle.get_result().unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_parent_can_recover_from_nested_error() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(Task::new(async {
        let failed = Task::<u32>::new(async { Err(Error::other("nope")) }).await;
        Ok(failed.unwrap_or(5))
    }));

    assert_eq!(handle.get_result().unwrap(), 5);
}

#[test]
fn test_step_without_signal_does_nothing() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(parked("late"));

    assert!(!env.step().unwrap());
    assert_eq!(handle.state(), TaskState::Suspended);

    assert!(fire(&env));
    assert_eq!(handle.get_result().unwrap(), "late");

    // Finished chains ignore the signal.
    assert!(!fire(&env));
}

#[test]
fn test_cancel_fails_the_pending_operation() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(weft::time::sleep(Duration::from_secs(30)));

    let completion = env.completion();
    assert!(completion.is_pending());
    assert!(completion.cancel());

    assert!(env.step().unwrap());
    assert!(env.done());

    let err = handle.get_result().unwrap_err();
    assert!(err.is_cancelled(), "unexpected error: {err}");
}

#[test]
fn test_dropping_environment_cancels_pending_operation() {
    init();

    let env = Environment::new().unwrap();
    let handle = env.attach(weft::time::sleep(Duration::from_secs(30)));
    let completion = env.completion();

    assert!(completion.is_pending());
    drop(env);

    assert!(!completion.is_pending());
    assert_eq!(handle.state(), TaskState::Suspended);
}
