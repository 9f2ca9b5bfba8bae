use std::ops::{Deref, DerefMut};

use tokio::sync::{Mutex, mpsc};

use crate::vm::Vm;

/// A fixed set of reusable machines. Acquiring suspends the caller while
/// every instance is lent out; the borrowed machine returns to the pool
/// when its guard drops.
///
/// Instances come back dirty. Whoever acquires one is expected to
/// [`Vm::reset`] it before running, nothing is scrubbed on return.
pub struct InstancePool {
    returns: mpsc::Sender<Vm>,
    idle: Mutex<mpsc::Receiver<Vm>>,
}

impl InstancePool {
    /// Builds a pool of `capacity` machines. Zero is rounded up to one.
    pub fn new(capacity: usize) -> InstancePool {
        let capacity = capacity.max(1);
        let (returns, idle) = mpsc::channel(capacity);
        for _ in 0..capacity {
            // Cannot fail, the channel was sized for exactly this many.
            let _ = returns.try_send(Vm::new());
        }
        InstancePool {
            returns,
            idle: Mutex::new(idle),
        }
    }

    /// Borrows a machine, waiting for one to come back when all are out.
    pub async fn acquire(&self) -> PooledVm {
        let mut idle = self.idle.lock().await;
        // The pool owns a sender for the whole of its life, so the channel
        // cannot close under us.
        let vm = idle.recv().await.unwrap_or_default();
        tracing::trace!("vm instance acquired");
        PooledVm {
            vm: Some(vm),
            home: self.returns.clone(),
        }
    }
}

/// A machine on loan from an [`InstancePool`]. Dereferences to [`Vm`] and
/// flows back into the pool on drop.
pub struct PooledVm {
    vm: Option<Vm>,
    home: mpsc::Sender<Vm>,
}

impl Deref for PooledVm {
    type Target = Vm;

    fn deref(&self) -> &Vm {
        // Only vacated on drop.
        self.vm.as_ref().expect("loaned instance present")
    }
}

impl DerefMut for PooledVm {
    fn deref_mut(&mut self) -> &mut Vm {
        self.vm.as_mut().expect("loaned instance present")
    }
}

impl Drop for PooledVm {
    fn drop(&mut self) {
        if let Some(vm) = self.vm.take() {
            // There is always room, the channel is sized for every instance.
            let _ = self.home.try_send(vm);
            tracing::trace!("vm instance returned");
        }
    }
}
