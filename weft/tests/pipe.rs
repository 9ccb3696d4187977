use weft::io::{self, Operation, Ticket, Transfer};
use weft::{Error, Scheduler, Task};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_pipe_round_trip() {
    init();

    let (reader, writer) = io::pipe().unwrap();

    let (mut scheduler, handles) = Scheduler::new([Task::new(async move {
        let written = writer.write_async(b"hello".to_vec()).await?;
        assert_eq!(written, 5);

        reader.read_exact_async(5).await
    })])
    .unwrap();

    scheduler.run().unwrap();

    assert_eq!(handles[0].get_result().unwrap(), b"hello");
}

#[test]
fn test_pipe_reports_end_of_stream() {
    init();

    let (reader, writer) = io::pipe().unwrap();

    let (mut scheduler, handles) = Scheduler::new([Task::new(async move {
        writer.write_async(b"abc".to_vec()).await?;
        drop(writer);

        let first = reader.read_async(vec![0; 16]).await?;
        let second = reader.read_async(vec![0; 16]).await?;

        Ok((first, second))
    })])
    .unwrap();

    scheduler.run().unwrap();

    let (first, second) = handles[0].get_result().unwrap();
    assert_eq!(first, b"abc");
    assert!(second.is_empty());
}

#[test]
fn test_read_exact_fails_on_premature_end() {
    init();

    let (reader, writer) = io::pipe().unwrap();

    let (mut scheduler, handles) = Scheduler::new([Task::new(async move {
        writer.write_async(b"abc".to_vec()).await?;
        drop(writer);

        reader.read_exact_async(8).await
    })])
    .unwrap();

    scheduler.run().unwrap();

    let err = handles[0].get_result().unwrap_err();
    assert!(
        matches!(
            err,
            Error::UnexpectedEof {
                expected: 8,
                received: 3
            }
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn test_producer_and_consumer_in_separate_environments() {
    init();

    let (reader, writer) = io::pipe().unwrap();

    let mut builder = Scheduler::builder();

    let consumer = builder.spawn(Task::new(async move {
        let mut total = Vec::new();
        for _ in 0..3 {
            total.extend(reader.read_exact_async(4).await?);
        }
        Ok(total)
    }));

    let producer = builder.spawn(Task::new(async move {
        let mut written = 0;
        for chunk in [b"one ", b"two ", b"six "] {
            written += writer.write_async(chunk.to_vec()).await?;
        }
        Ok(written)
    }));

    let mut scheduler = builder.build().unwrap();
    scheduler.run().unwrap();

    assert_eq!(producer.get_result().unwrap(), 12);
    assert_eq!(consumer.get_result().unwrap(), b"one two six ");
}

struct Refused;

impl Operation for Refused {
    type Output = ();

    fn name(&self) -> &'static str {
        "refused"
    }

    fn initiate(&mut self, _ticket: Ticket) -> std::io::Result<()> {
        Err(std::io::Error::other("not today"))
    }

    fn finish(self, _transfer: Transfer) -> weft::Result<()> {
        Ok(())
    }
}

struct Broken;

impl Operation for Broken {
    type Output = ();

    fn name(&self) -> &'static str {
        "broken"
    }

    fn initiate(&mut self, ticket: Ticket) -> std::io::Result<()> {
        ticket.complete(Err(std::io::ErrorKind::BrokenPipe.into()));
        Ok(())
    }

    fn finish(self, _transfer: Transfer) -> weft::Result<()> {
        Ok(())
    }
}

#[test]
fn test_initiation_and_completion_failures_differ() {
    init();

    let mut builder = Scheduler::builder();
    let refused = builder.spawn(io::submit(Refused));
    let broken = builder.spawn(io::submit(Broken));

    let mut scheduler = builder.build().unwrap();

    // A refused operation never suspends.
    assert!(refused.is_done());

    scheduler.run().unwrap();
    assert_eq!(scheduler.ticks(), 1);

    match refused.get_result() {
        Err(Error::Initiate { op, source }) => {
            assert_eq!(op, "refused");
            assert_eq!(source.to_string(), "not today");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    match broken.get_result() {
        Err(Error::Complete { op, source }) => {
            assert_eq!(op, "broken");
            assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
