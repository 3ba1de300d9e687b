use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::InferError;

/// Bounded pool of per-call execution contexts.
///
/// The pool is the backpressure point that bounds concurrent in-flight
/// calls: `acquire` blocks the calling worker while the pool is empty and
/// surfaces [`InferError::ContextsExhausted`] once the wait exceeds the
/// caller's budget. A context is exclusively owned by one in-flight call;
/// the guard returns it on drop, whichever exit path the call takes.
pub struct ContextPool<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    idle: Mutex<Vec<C>>,
    returned: Condvar,
    capacity: usize,
}

impl<C> ContextPool<C> {
    pub fn new(contexts: Vec<C>) -> Self {
        let capacity = contexts.len();
        Self {
            inner: Arc::new(Inner {
                idle: Mutex::new(contexts),
                returned: Condvar::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn idle(&self) -> usize {
        self.inner
            .idle
            .lock()
            .expect("context pool mutex poisoned")
            .len()
    }

    pub fn acquire(&self, timeout: Duration) -> Result<PooledContext<C>, InferError> {
        let idle = self
            .inner
            .idle
            .lock()
            .expect("context pool mutex poisoned");
        let (mut idle, _) = self
            .inner
            .returned
            .wait_timeout_while(idle, timeout, |idle| idle.is_empty())
            .expect("context pool mutex poisoned");

        match idle.pop() {
            Some(ctx) => Ok(PooledContext {
                ctx: Some(ctx),
                pool: Arc::clone(&self.inner),
            }),
            None => Err(InferError::ContextsExhausted { waited: timeout }),
        }
    }
}

impl<C> Clone for ContextPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Guard over an acquired context. Dropping it puts the context back and
/// wakes one waiting worker.
pub struct PooledContext<C> {
    ctx: Option<C>,
    pool: Arc<Inner<C>>,
}

impl<C> Deref for PooledContext<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.ctx.as_ref().expect("context present until drop")
    }
}

impl<C> DerefMut for PooledContext<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.ctx.as_mut().expect("context present until drop")
    }
}

impl<C> Drop for PooledContext<C> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            let mut idle = self
                .pool
                .idle
                .lock()
                .expect("context pool mutex poisoned");
            idle.push(ctx);
            self.pool.returned.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn acquire_and_release_cycles() {
        let pool = ContextPool::new(vec![0u32, 1]);
        assert_eq!(pool.capacity(), 2);

        let a = pool.acquire(Duration::from_millis(10)).unwrap();
        let b = pool.acquire(Duration::from_millis(10)).unwrap();
        assert_eq!(pool.idle(), 0);

        let err = pool
            .acquire(Duration::from_millis(10))
            .err()
            .expect("exhausted pool must time out");
        assert!(matches!(err, InferError::ContextsExhausted { .. }));

        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let pool = ContextPool::new(vec![()]);
        let held = pool.acquire(Duration::from_millis(10)).unwrap();

        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire(Duration::from_secs(2)).is_ok())
        };

        thread::sleep(Duration::from_millis(50));
        drop(held);
        assert!(waiter.join().unwrap());
    }
}
