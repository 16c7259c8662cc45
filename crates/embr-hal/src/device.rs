//! Single-owner device slots.
//!
//! The filesystem, the radio and each peripheral bus have exactly one owner
//! at a time. A [`DeviceSlot`] holds the device while nobody owns it; the
//! owning task holds a [`DeviceGuard`] and the device goes back into the
//! slot when the guard drops (task returned, panicked or was terminated).

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use crate::HalError;

/// Parking place for a device between owners.
#[derive(Debug)]
pub struct DeviceSlot<T> {
    name: &'static str,
    device: Mutex<Option<T>>,
}

impl<T> DeviceSlot<T> {
    /// Create a slot holding `device`.
    pub fn new(name: &'static str, device: T) -> Arc<Self> {
        Arc::new(Self {
            name,
            device: Mutex::new(Some(device)),
        })
    }

    /// Device label used in errors and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take exclusive ownership of the device.
    ///
    /// # Returns
    /// * `Ok(guard)` - The caller now owns the device
    /// * `Err(HalError::DeviceBusy)` - Another owner holds it
    pub fn claim(self: &Arc<Self>) -> Result<DeviceGuard<T>, HalError> {
        let device = self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HalError::DeviceBusy(self.name))?;
        Ok(DeviceGuard {
            slot: Arc::clone(self),
            device: Some(device),
        })
    }

    /// True if no task currently owns the device.
    pub fn is_available(&self) -> bool {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn put_back(&self, device: T) {
        *self.device.lock().unwrap_or_else(PoisonError::into_inner) = Some(device);
    }
}

/// Exclusive ownership of a device. Returns it to its slot on drop.
#[derive(Debug)]
pub struct DeviceGuard<T> {
    slot: Arc<DeviceSlot<T>>,
    device: Option<T>,
}

impl<T> Deref for DeviceGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` empties the option.
        match &self.device {
            Some(device) => device,
            None => unreachable!("device guard used after release"),
        }
    }
}

impl<T> DerefMut for DeviceGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.device {
            Some(device) => device,
            None => unreachable!("device guard used after release"),
        }
    }
}

impl<T> Drop for DeviceGuard<T> {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            self.slot.put_back(device);
        }
    }
}
