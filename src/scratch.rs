//! Scratch nodes for networks that may run on many threads at once.
//!
//! Every live network holds one of [`MAX_NETWORKS`] slots. A thread running a network checks out
//! the chain of nodes it owns for that `(slot, thread)` pair, works on it without holding any lock,
//! and checks it back in. A slot's chains are freed when its network is dropped, so a network that
//! later receives the same slot starts from fresh nodes.

use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::{LazyLock, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};

use crate::Node;

/// Upper bound on the number of networks alive at the same time.
pub const MAX_NETWORKS: usize = 256;

struct Pool {
    free: Vec<usize>,
    chains: HashMap<(usize, ThreadId), Vec<Node>>,
}

static POOL: LazyLock<Mutex<Pool>> = LazyLock::new(|| {
    Mutex::new(Pool {
        free: (0..MAX_NETWORKS).rev().collect(),
        chains: HashMap::new(),
    })
});

fn pool() -> MutexGuard<'static, Pool> {
    POOL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Number of slots not held by any network.
pub fn available_slots() -> usize {
    pool().free.len()
}

/// A slot of the scratch pool, returned when dropped.
pub struct ScratchSlot {
    id: usize,
}

impl Debug for ScratchSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ScratchSlot({})", self.id)
    }
}

impl ScratchSlot {
    /// # Panics
    ///
    /// If [`MAX_NETWORKS`] slots are already held.
    #[track_caller]
    pub fn acquire() -> Self {
        let id = pool().free.pop();
        let Some(id) = id else {
            panic!("more than {MAX_NETWORKS} networks are alive at once");
        };
        Self { id }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs `f` on the calling thread's chain of at least `len` nodes.
    ///
    /// Nodes keep their contents between calls on the same thread, so a backward pass sees the
    /// values of the forward pass before it.
    pub fn with_chain<R>(&self, len: usize, f: impl FnOnce(&mut [Node]) -> R) -> R {
        let key = (self.id, thread::current().id());
        let mut chain = pool().chains.remove(&key).unwrap_or_default();
        if chain.len() < len {
            chain.resize_with(len, Node::default);
        }
        let result = f(&mut chain[..len]);
        pool().chains.insert(key, chain);
        result
    }
}

impl Drop for ScratchSlot {
    fn drop(&mut self) {
        let mut pool = pool();
        let id = self.id;
        pool.chains.retain(|&(slot, _), _| slot != id);
        pool.free.push(id);
    }
}
