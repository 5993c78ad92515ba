/* 📖 # Why are the threading primitives empty?

The browser host runs the backend on a single thread with no way to block it. Starting a thread
therefore runs the work right away on the caller's thread, and everything that would wait or
lock has nothing to wait for. The types exist so callers written against the full PAL compile
and behave sensibly here.
*/

use tracing::trace;

/// Handle of a "thread" that has already finished.
#[derive(Debug)]
pub struct Thread(());

impl Thread {
    /// Runs `work` to completion before returning.
    pub fn start<F: FnOnce()>(work: F) -> Thread {
        work();
        Thread(())
    }

    pub fn join(self) {}

    pub fn detach(self) {}

    pub fn sleep(milliseconds: u32) {
        trace!(milliseconds, "sleep ignored");
    }
}

/// Lock that never contends.
#[derive(Debug, Default)]
pub struct Mutex(());

impl Mutex {
    pub fn new() -> Self {
        Self(())
    }

    pub fn lock(&self) {}

    pub fn unlock(&self) {}
}

/// Condition that is never waited on.
#[derive(Debug, Default)]
pub struct Waitable(());

impl Waitable {
    pub fn new() -> Self {
        Self(())
    }

    pub fn signal(&self) {}

    pub fn wait(&self) {}

    pub fn wait_for(&self, milliseconds: u32) {
        trace!(milliseconds, "wait ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_runs_inline() {
        let mut ran = false;
        let thread = Thread::start(|| ran = true);
        assert!(ran);
        thread.join();
    }

    #[test]
    fn test_primitives_return_immediately() {
        let mutex = Mutex::new();
        mutex.lock();
        mutex.lock();
        mutex.unlock();

        let waitable = Waitable::new();
        waitable.wait();
        waitable.wait_for(1000);
        waitable.signal();

        Thread::sleep(10_000);
        Thread::start(|| {}).detach();
    }
}
