// tests/queue_props.rs

use proptest::prelude::*;

use spoolq::engine::watch_queue;
use spoolq_test_utils::builders::JobDescriptorBuilder;

proptest! {
    /// Whatever the interleaving of appends and pops, jobs come out in the
    /// order they went in, each exactly once.
    #[test]
    fn queue_is_fifo(ops in prop::collection::vec(any::<bool>(), 0..64)) {
        let (tx, mut rx) = watch_queue();
        let mut next = 0usize;
        let mut popped = Vec::new();

        for push in ops {
            if push {
                tx.enqueue(JobDescriptorBuilder::new(&format!("job{next}")).build()).unwrap();
                next += 1;
            } else if let Some(job) = rx.dequeue() {
                popped.push(job.name());
            }
        }
        prop_assert_eq!(rx.len(), next - popped.len());
        popped.extend(rx.drain().iter().map(|j| j.name()));

        let expected: Vec<String> = (0..next).map(|i| format!("job{i}")).collect();
        prop_assert_eq!(popped, expected);
        prop_assert!(rx.is_empty());
    }
}
