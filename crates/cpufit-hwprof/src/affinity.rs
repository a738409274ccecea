//! Thread pinning boundary. Bit `i` of a mask selects logical CPU `i`; masks
//! and ids are handed to the OS as-is.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("setting CPU affinity failed: {0}")]
    Os(#[from] std::io::Error),

    #[error("CPU affinity is not supported on this platform")]
    NotSupported,
}

/// What a mask is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityScope {
    /// `sched_setaffinity(0, ..)`: pins the calling thread only. Threads it
    /// spawns afterwards inherit the mask, so apply this before starting workers.
    Process,
    /// Calling worker thread; the id is only carried for diagnostics.
    Worker(usize),
}

pub fn set_affinity(scope: AffinityScope, mask: u64) -> Result<(), AffinityError> {
    debug!(?scope, mask, "set cpu affinity");
    imp::set_affinity(scope, mask)
}

#[cfg(target_os = "linux")]
mod imp {
    use super::{AffinityError, AffinityScope};
    use std::io;
    use std::mem;

    pub fn set_affinity(scope: AffinityScope, mask: u64) -> Result<(), AffinityError> {
        // SAFETY: cpu_set_t is plain data; zeroed is the empty set.
        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        for cpu in 0..u64::BITS as usize {
            if mask & (1u64 << cpu) != 0 {
                // SAFETY: cpu < 64, well inside CPU_SETSIZE.
                unsafe { libc::CPU_SET(cpu, &mut set) };
            }
        }

        let size = mem::size_of::<libc::cpu_set_t>();
        match scope {
            AffinityScope::Process => {
                // SAFETY: `set` is initialized and `size` is its exact size.
                let rc = unsafe { libc::sched_setaffinity(0, size, &set) };
                if rc != 0 {
                    return Err(io::Error::last_os_error().into());
                }
            }
            AffinityScope::Worker(_) => {
                // SAFETY: pthread_self() is always a live thread; `set` as above.
                let rc = unsafe { libc::pthread_setaffinity_np(libc::pthread_self(), size, &set) };
                if rc != 0 {
                    return Err(io::Error::from_raw_os_error(rc).into());
                }
            }
        }
        Ok(())
    }

    /// First CPU below 64 the calling thread may run on.
    #[cfg(test)]
    pub fn first_allowed_cpu() -> Option<usize> {
        // SAFETY: cpu_set_t is plain data; zeroed is the empty set.
        let mut set: libc::cpu_set_t = unsafe { mem::zeroed() };
        // SAFETY: the size passed is exactly that of `set`.
        let rc =
            unsafe { libc::sched_getaffinity(0, mem::size_of::<libc::cpu_set_t>(), &mut set) };
        if rc != 0 {
            return None;
        }
        // SAFETY: cpu < 64, inside CPU_SETSIZE.
        (0..u64::BITS as usize).find(|&cpu| unsafe { libc::CPU_ISSET(cpu, &set) })
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::{AffinityError, AffinityScope};

    pub fn set_affinity(_scope: AffinityScope, _mask: u64) -> Result<(), AffinityError> {
        Err(AffinityError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn worker_can_pin_to_an_allowed_cpu() {
        let Some(cpu) = imp::first_allowed_cpu() else {
            return;
        };
        // run on a scratch thread so the test harness thread keeps its mask
        let res = std::thread::spawn(move || set_affinity(AffinityScope::Worker(0), 1u64 << cpu))
            .join()
            .unwrap();
        assert!(res.is_ok(), "{res:?}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn process_scope_is_inherited_by_later_threads() {
        let Some(cpu) = imp::first_allowed_cpu() else {
            return;
        };
        let child_cpu = std::thread::spawn(move || {
            set_affinity(AffinityScope::Process, 1u64 << cpu).unwrap();
            std::thread::spawn(imp::first_allowed_cpu).join().unwrap()
        })
        .join()
        .unwrap();
        assert_eq!(child_cpu, Some(cpu));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn empty_mask_is_rejected_by_the_os() {
        let res = std::thread::spawn(|| set_affinity(AffinityScope::Worker(1), 0))
            .join()
            .unwrap();
        assert!(matches!(res, Err(AffinityError::Os(_))));
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn unsupported_platforms_report_it() {
        assert!(matches!(
            set_affinity(AffinityScope::Process, 1),
            Err(AffinityError::NotSupported)
        ));
    }
}
