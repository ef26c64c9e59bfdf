/*!

Micro (mu) library: the few synchronization helpers a single-context
boot routine still needs.

 */


#[doc(hidden)] mod mu_mutex;

#[doc(inline)] pub use self::mu_mutex::{MuMutex, MuMutexGuard};
