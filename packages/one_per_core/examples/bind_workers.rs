//! Detects the processor topology and binds a scoped-thread worker pool so that every worker
//! owns one physical core.

use std::sync::Mutex;
use std::thread;

use one_per_core::{AffinityManager, CpuTopology, WorkerPool};

/// A minimal pool that fans each parallel region out over scoped threads.
struct ScopedPool {
    worker_count: Mutex<usize>,
}

impl WorkerPool for ScopedPool {
    fn set_worker_count(&self, count: usize) {
        *self
            .worker_count
            .lock()
            .expect("no other user of this mutex can panic") = count;
    }

    fn run_on_workers(&self, body: &(dyn Fn(usize) + Sync)) {
        let count = *self
            .worker_count
            .lock()
            .expect("no other user of this mutex can panic");

        thread::scope(|scope| {
            for index in 0..count {
                scope.spawn(move || body(index));
            }
        });
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    let topology = CpuTopology::detect();
    let manager = AffinityManager::new(&topology);

    manager.log_summary();

    if !manager.is_binding_allowed() {
        println!("binding is disabled (environment override or GPU mode); workers run unbound");
        return;
    }

    // Housekeeping stays off the primary worker core.
    manager.bind_current_thread_to_secondary_core();

    let pool = ScopedPool {
        worker_count: Mutex::new(0),
    };

    manager.bind_worker_pool(&pool);

    // Scoped threads are fresh per region, so this region re-applies its binding. A real
    // runtime with persistent workers binds once, inside bind_worker_pool.
    pool.run_on_workers(&|index| {
        manager
            .bind_current_thread_to_core(index)
            .expect("index is within the configured worker count");

        println!("worker {index} is bound to its own physical core");
    });
}
