// Copyright 2025 canopy Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crossbeam::queue::ArrayQueue;

/// A bounded, lock-free pool of reusable objects.
///
/// [`ObjectPool::acquire`] never blocks: when the pool is empty a fresh object is created. [`ObjectPool::release`]
/// drops the object when the pool is full.
pub struct ObjectPool<T> {
    inner: Arc<ObjectPoolInner<T>>,
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

struct ObjectPoolInner<T> {
    queue: Option<ArrayQueue<T>>,
    create: Box<dyn Fn() -> T + Send + Sync + 'static>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Reuse counters of an [`ObjectPool`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPoolStats {
    /// Acquisitions served by a pooled object.
    pub hits: u64,
    /// Acquisitions that had to create a fresh object.
    pub misses: u64,
}

impl<T> ObjectPool<T>
where
    T: Default + 'static,
{
    /// Create a pool that holds up to `capacity` objects created by [`Default`].
    pub fn new(capacity: usize) -> Self {
        Self::new_with_create(capacity, T::default)
    }
}

impl<T> ObjectPool<T> {
    /// Create a pool that holds up to `capacity` objects created by `create`.
    pub fn new_with_create(capacity: usize, create: impl Fn() -> T + Send + Sync + 'static) -> Self {
        let inner = ObjectPoolInner {
            queue: if capacity == 0 {
                None
            } else {
                Some(ArrayQueue::new(capacity))
            },
            create: Box::new(create),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Take an object from the pool, or create one if the pool is empty.
    pub fn acquire(&self) -> T {
        match self.inner.queue.as_ref().and_then(|queue| queue.pop()) {
            Some(item) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                (self.inner.create)()
            }
        }
    }

    /// Return an object to the pool. Returns `false` if the pool is full and the object is dropped.
    pub fn release(&self, item: T) -> bool {
        match self.inner.queue.as_ref() {
            Some(queue) => queue.push(item).is_ok(),
            None => false,
        }
    }

    /// Number of pooled objects.
    pub fn len(&self) -> usize {
        self.inner.queue.as_ref().map(|q| q.len()).unwrap_or_default()
    }

    /// Returns `true` if no object is pooled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of pooled objects.
    pub fn capacity(&self) -> usize {
        self.inner.queue.as_ref().map(|q| q.capacity()).unwrap_or_default()
    }

    /// Reuse counters.
    pub fn stats(&self) -> ObjectPoolStats {
        ObjectPoolStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(capacity: usize) {
        let pool: ObjectPool<usize> = ObjectPool::new(capacity);

        for i in 0..capacity * 2 {
            assert_eq!(pool.release(i), i < capacity);
        }
        assert_eq!(pool.len(), capacity);

        for i in 0..capacity {
            assert_eq!(pool.acquire(), i);
        }

        for _ in 0..capacity {
            assert_eq!(pool.acquire(), 0);
        }

        let stats = pool.stats();
        assert_eq!(stats.hits, capacity as u64);
        assert_eq!(stats.misses, capacity as u64);
    }

    #[test]
    fn test_object_pool() {
        case(100);
    }

    #[test]
    fn test_object_pool_zero() {
        case(0);
        let pool: ObjectPool<usize> = ObjectPool::new(0);
        pool.release(1);
        assert_eq!(pool.acquire(), 0);
        assert_eq!(pool.stats().misses, 1);
    }

    #[test]
    fn test_object_pool_concurrent() {
        let pool: ObjectPool<Vec<u8>> = ObjectPool::new_with_create(16, || Vec::with_capacity(64));
        let handles = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut buf = pool.acquire();
                        buf.clear();
                        buf.push(1);
                        pool.release(buf);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = pool.stats();
        assert_eq!(stats.hits + stats.misses, 4000);
        assert!(pool.len() <= 16);
    }
}
