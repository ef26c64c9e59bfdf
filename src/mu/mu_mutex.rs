//
// Micro Mutex - A Mutual Exclusion Primitive using Spin Lock
//
// The bridge runs on one CPU with interrupts masked, so the lock is never
// contended in practice.  It still turns a re-entrant use (e.g. logging
// from inside the console sink) into a refusal instead of aliasing.
//

use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};


pub struct MuMutex<T> {
    value: UnsafeCell<T>,
    locked: AtomicBool,
}

unsafe impl<T: Send> Send for MuMutex<T> {}
unsafe impl<T: Send> Sync for MuMutex<T> {}

impl<T> MuMutex<T> {
    pub const fn new(value: T) -> Self {
	Self {
	    value: UnsafeCell::new(value),
	    locked: AtomicBool::new(false),
	}
    }

    /// Spins until the lock is free.
    pub fn lock(&self) -> MuMutexGuard<'_, T> {
	while self.locked.compare_exchange_weak(false,
						true,
						Ordering::Acquire,
						Ordering::Relaxed).is_err() {
	    while self.locked.load(Ordering::Relaxed) {
		spin_loop();
	    }
	}
	MuMutexGuard { mutex: self }
    }

    /// Takes the lock only if nobody holds it.  Never fails spuriously.
    pub fn try_lock(&self) -> Option<MuMutexGuard<'_, T>> {
	self.locked.compare_exchange(false,
				     true,
				     Ordering::Acquire,
				     Ordering::Relaxed)
	    .ok()
	    .map(|_| MuMutexGuard { mutex: self })
    }

    fn release(&self) {
	self.locked.store(false, Ordering::Release);
    }
}


#[must_use = "If not used, immediately unlocked"]
pub struct MuMutexGuard<'a, T> {
    mutex: &'a MuMutex<T>,
}

impl<'a, T> Drop for MuMutexGuard<'a, T> {
    fn drop(&mut self) {
	self.mutex.release();
    }
}

impl<'a, T> Deref for MuMutexGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
	unsafe {
	    &*self.mutex.value.get()
	}
    }
}

impl<'a, T> DerefMut for MuMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
	unsafe {
	    &mut *self.mutex.value.get()
	}
    }
}
