use proptest::prelude::*;

use buildweb::engine::{PendingQueue, STAGE_ORDER, Task};

fn task_strategy() -> impl Strategy<Value = Task> {
    (0..STAGE_ORDER.len(), prop::sample::select(vec!["", "home", "admin", "vendor", "handlers"]))
        .prop_map(|(kind, target)| Task::new(STAGE_ORDER[kind], target))
}

proptest! {
    #[test]
    fn drain_is_unique_and_stage_ordered(tasks in prop::collection::vec(task_strategy(), 0..40)) {
        let mut queue = PendingQueue::new();
        for task in tasks.iter().cloned() {
            queue.push(task);
        }
        let drained = queue.drain();

        // Every distinct input task appears exactly once.
        let mut expected: Vec<Task> = Vec::new();
        for task in tasks.iter() {
            if !expected.contains(task) {
                expected.push(task.clone());
            }
        }
        prop_assert_eq!(drained.len(), expected.len());
        for task in expected.iter() {
            prop_assert!(drained.contains(task));
        }

        // Kinds never decrease.
        for pair in drained.windows(2) {
            prop_assert!(pair[0].kind.priority() <= pair[1].kind.priority());
        }

        // Within a kind, first insertion wins the position.
        for kind in STAGE_ORDER {
            let got: Vec<&Task> = drained.iter().filter(|t| t.kind == kind).collect();
            let want: Vec<&Task> = expected.iter().filter(|t| t.kind == kind).collect();
            prop_assert_eq!(got, want);
        }

        prop_assert!(queue.is_empty());
    }

    #[test]
    fn pushing_a_pending_task_is_a_no_op(tasks in prop::collection::vec(task_strategy(), 1..20)) {
        let mut queue = PendingQueue::from_tasks(tasks.clone());
        let before: Vec<Task> = queue.iter().cloned().collect();

        for task in tasks {
            prop_assert!(!queue.push(task));
        }

        let after: Vec<Task> = queue.iter().cloned().collect();
        prop_assert_eq!(before, after);
    }
}
