use mirrorcp::pipeline::{BoundedQueue, QueueError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_new_rejects_zero_capacity() {
    assert_eq!(
        BoundedQueue::<u32>::new(0).err(),
        Some(QueueError::ZeroCapacity)
    );
}

#[test]
fn test_fifo_across_batches() {
    let q = BoundedQueue::new(8).unwrap();
    q.enqueue_batch(vec![1, 2, 3]).unwrap();
    q.enqueue_batch(vec![4, 5]).unwrap();
    assert_eq!(q.len(), 5);
    assert_eq!(q.dequeue_batch(2), Some(vec![1, 2]));
    assert_eq!(q.dequeue_batch(10), Some(vec![3, 4, 5]));
    assert!(q.is_empty());
}

#[test]
fn test_ring_wraps_around() {
    let q = BoundedQueue::new(3).unwrap();
    q.enqueue_batch(vec![1, 2, 3]).unwrap();
    assert_eq!(q.dequeue_batch(2), Some(vec![1, 2]));
    q.enqueue_batch(vec![4, 5]).unwrap();
    assert_eq!(q.len(), 3);
    assert_eq!(q.dequeue_batch(3), Some(vec![3, 4, 5]));
}

#[test]
fn test_dequeue_zero_takes_one() {
    let q = BoundedQueue::new(4).unwrap();
    q.enqueue_batch(vec!['a', 'b']).unwrap();
    assert_eq!(q.dequeue_batch(0), Some(vec!['a']));
}

#[test]
fn test_push_and_pop() {
    let q = BoundedQueue::new(2).unwrap();
    q.push("x").unwrap();
    q.push("y").unwrap();
    assert_eq!(q.pop(), Some("x"));
    assert_eq!(q.pop(), Some("y"));
    assert_eq!(q.capacity(), 2);
}

#[test]
fn test_batch_larger_than_capacity_is_rejected() {
    let q = BoundedQueue::new(4).unwrap();
    assert_eq!(
        q.enqueue_batch(vec![0; 5]),
        Err(QueueError::BatchTooLarge {
            batch: 5,
            capacity: 4
        })
    );
    assert!(q.is_empty());
}

#[test]
fn test_empty_batch_is_noop() {
    let q = BoundedQueue::<u8>::new(1).unwrap();
    q.enqueue_batch(Vec::new()).unwrap();
    assert!(q.is_empty());
}

#[test]
fn test_shutdown_drains_then_closes() {
    let q = BoundedQueue::new(4).unwrap();
    q.enqueue_batch(vec![1, 2, 3]).unwrap();
    q.signal_shutdown();
    assert!(q.is_shut_down());
    assert_eq!(q.dequeue_batch(2), Some(vec![1, 2]));
    assert_eq!(q.pop(), Some(3));
    assert_eq!(q.dequeue_batch(2), None);
    assert_eq!(q.dequeue_batch(2), None);
    assert_eq!(q.pop(), None);
}

#[test]
fn test_enqueue_after_shutdown_fails() {
    let q = BoundedQueue::new(4).unwrap();
    q.signal_shutdown();
    q.signal_shutdown();
    assert_eq!(q.enqueue_batch(vec![1]), Err(QueueError::ShutDown));
    assert_eq!(q.push(2), Err(QueueError::ShutDown));
    assert_eq!(q.dequeue_batch(1), None);
}

#[test]
fn test_shutdown_wakes_blocked_consumer() {
    let q = Arc::new(BoundedQueue::<u32>::new(2).unwrap());
    let consumer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.dequeue_batch(1))
    };
    thread::sleep(Duration::from_millis(50));
    q.signal_shutdown();
    assert_eq!(consumer.join().unwrap(), None);
}

#[test]
fn test_enqueue_blocks_until_whole_batch_fits() {
    let q = Arc::new(BoundedQueue::new(4).unwrap());
    q.enqueue_batch(vec![1, 2, 3]).unwrap();
    let producer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.enqueue_batch(vec![4, 5]))
    };
    thread::sleep(Duration::from_millis(50));
    // one free slot is not enough for a batch of two
    assert_eq!(q.len(), 3);
    assert_eq!(q.dequeue_batch(1), Some(vec![1]));
    producer.join().unwrap().unwrap();
    assert_eq!(q.dequeue_batch(8), Some(vec![2, 3, 4, 5]));
}

#[test]
fn test_shutdown_fails_blocked_producer() {
    let q = Arc::new(BoundedQueue::new(1).unwrap());
    q.push(1).unwrap();
    let producer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.push(2))
    };
    thread::sleep(Duration::from_millis(50));
    q.signal_shutdown();
    assert_eq!(producer.join().unwrap(), Err(QueueError::ShutDown));
    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.pop(), None);
}

#[test]
fn test_many_producers_many_consumers_deliver_everything_once() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;
    const BATCH: usize = 7;

    let q = Arc::new(BoundedQueue::new(16).unwrap());
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let items: Vec<usize> = (0..PER_PRODUCER).map(|i| p * PER_PRODUCER + i).collect();
                for chunk in items.chunks(BATCH) {
                    q.enqueue_batch(chunk.to_vec()).unwrap();
                }
            })
        })
        .collect();
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(batch) = q.dequeue_batch(5) {
                    assert!(!batch.is_empty() && batch.len() <= 5);
                    got.extend(batch);
                }
                got
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    q.signal_shutdown();

    let mut all: Vec<usize> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();
    all.sort_unstable();
    let expected: Vec<usize> = (0..PRODUCERS * PER_PRODUCER).collect();
    assert_eq!(all, expected);
}

#[test]
fn test_batches_from_one_producer_stay_contiguous() {
    let q = Arc::new(BoundedQueue::new(6).unwrap());
    let a = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            for _ in 0..50 {
                q.enqueue_batch(vec![('a', 0), ('a', 1), ('a', 2)]).unwrap();
            }
        })
    };
    let b = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            for _ in 0..50 {
                q.enqueue_batch(vec![('b', 0), ('b', 1), ('b', 2)]).unwrap();
            }
        })
    };
    let consumer = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            let mut seq = Vec::new();
            while let Some(item) = q.pop() {
                seq.push(item);
            }
            seq
        })
    };
    a.join().unwrap();
    b.join().unwrap();
    q.signal_shutdown();
    let seq = consumer.join().unwrap();
    assert_eq!(seq.len(), 300);
    for triple in seq.chunks(3) {
        let owner = triple[0].0;
        assert_eq!(triple, &[(owner, 0), (owner, 1), (owner, 2)]);
    }
}
