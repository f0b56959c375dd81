use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::capture::domain::frame_source::CaptureError;

static PROCESS_WIDE: OnceLock<DeviceClaims> = OnceLock::new();

/// Table of capture devices currently held by a running source.
///
/// Two sources sharing a table cannot stream from the same device index at
/// once; the second `acquire` fails with `DeviceBusy`.
#[derive(Clone, Debug, Default)]
pub struct DeviceClaims {
    held: Arc<Mutex<BTreeSet<u32>>>,
}

impl DeviceClaims {
    /// An isolated table, independent of every other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table shared by every source in this process that does not get
    /// an explicit one.
    pub fn process_wide() -> Self {
        PROCESS_WIDE.get_or_init(DeviceClaims::new).clone()
    }

    pub fn acquire(&self, index: u32) -> Result<DeviceClaim, CaptureError> {
        if !self.lock().insert(index) {
            return Err(CaptureError::DeviceBusy {
                index,
                reason: "already in use by another capture source".into(),
            });
        }
        Ok(DeviceClaim {
            index,
            claims: self.clone(),
        })
    }

    pub fn is_claimed(&self, index: u32) -> bool {
        self.lock().contains(&index)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u32>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive hold on one device index; released on drop.
#[derive(Debug)]
pub struct DeviceClaim {
    index: u32,
    claims: DeviceClaims,
}

impl DeviceClaim {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        self.claims.lock().remove(&self.index);
    }
}
