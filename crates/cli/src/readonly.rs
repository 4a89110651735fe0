//! Scoped read-only enforcement on the target dataset.
//!
//! While a stream is being received, the target is forced `readonly=on` so
//! nothing mutates it mid-transfer. The original value must come back on
//! every exit path: the guard restores explicitly on success (so failures
//! surface) and from `Drop` as a backstop on error and panic paths.

use tracing::warn;
use transport::Location;
use zfs::ZfsError;

/// Access to dataset properties, injectable for tests.
pub trait PropertyAccess {
    /// Reads one property of `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`ZfsError`] when the property cannot be read.
    fn get(&self, dataset: &str, prop: &str) -> Result<String, ZfsError>;

    /// Writes one property of `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`ZfsError`] when the property cannot be written.
    fn set(&self, dataset: &str, prop: &str, value: &str) -> Result<(), ZfsError>;
}

/// [`PropertyAccess`] backed by the real ZFS control plane.
#[derive(Clone, Debug)]
pub struct ZfsProperties {
    location: Location,
}

impl ZfsProperties {
    /// Builds property access for one location.
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

impl PropertyAccess for ZfsProperties {
    fn get(&self, dataset: &str, prop: &str) -> Result<String, ZfsError> {
        zfs::get_prop(&self.location, dataset, prop)
    }

    fn set(&self, dataset: &str, prop: &str, value: &str) -> Result<(), ZfsError> {
        zfs::set_prop(&self.location, dataset, prop, value)
    }
}

/// RAII guard holding the target dataset read-only.
///
/// [`ReadonlyGuard::engage`] saves the current `readonly` value and forces
/// it `on`. Call [`ReadonlyGuard::restore`] after the transfer so a failed
/// restore is reported; dropping an unrestored guard restores best-effort.
#[derive(Debug)]
pub struct ReadonlyGuard<P: PropertyAccess> {
    props: P,
    dataset: String,
    saved: String,
    restored: bool,
}

impl<P: PropertyAccess> ReadonlyGuard<P> {
    /// Saves the current `readonly` value of `dataset` and sets it `on`.
    ///
    /// # Errors
    ///
    /// Returns [`ZfsError`] when the property cannot be read or written;
    /// in that case nothing was changed that needs restoring.
    pub fn engage(props: P, dataset: &str) -> Result<Self, ZfsError> {
        let saved = props.get(dataset, "readonly")?;
        props.set(dataset, "readonly", "on")?;
        Ok(Self {
            props,
            dataset: dataset.to_string(),
            saved,
            restored: false,
        })
    }

    /// Returns the value `readonly` is restored to.
    #[must_use]
    pub fn saved_value(&self) -> &str {
        &self.saved
    }

    /// Restores the saved `readonly` value.
    ///
    /// # Errors
    ///
    /// Returns [`ZfsError`] when the write fails; the guard still counts
    /// as restored so `Drop` does not retry.
    pub fn restore(mut self) -> Result<(), ZfsError> {
        self.apply_restore()
    }

    fn apply_restore(&mut self) -> Result<(), ZfsError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.props.set(&self.dataset, "readonly", &self.saved)
    }
}

impl<P: PropertyAccess> Drop for ReadonlyGuard<P> {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(error) = self.apply_restore() {
                warn!(
                    "failed to restore readonly={} on {}: {error}",
                    self.saved, self.dataset
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PropertyAccess, ReadonlyGuard};
    use std::cell::RefCell;
    use std::rc::Rc;
    use zfs::ZfsError;

    /// Records every property write and serves a fixed starting value.
    #[derive(Clone, Default)]
    struct Recorder {
        value: Rc<RefCell<String>>,
        writes: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn with_value(value: &str) -> Self {
            let recorder = Self::default();
            *recorder.value.borrow_mut() = value.to_string();
            recorder
        }
    }

    impl PropertyAccess for Recorder {
        fn get(&self, _dataset: &str, _prop: &str) -> Result<String, ZfsError> {
            Ok(self.value.borrow().clone())
        }

        fn set(&self, _dataset: &str, _prop: &str, value: &str) -> Result<(), ZfsError> {
            *self.value.borrow_mut() = value.to_string();
            self.writes.borrow_mut().push(value.to_string());
            Ok(())
        }
    }

    #[test]
    fn engage_forces_on_and_restore_returns_the_saved_value() {
        let recorder = Recorder::with_value("off");
        let guard = ReadonlyGuard::engage(recorder.clone(), "tank/data").expect("engages");
        assert_eq!(*recorder.value.borrow(), "on");
        assert_eq!(guard.saved_value(), "off");
        guard.restore().expect("restores");
        assert_eq!(*recorder.value.borrow(), "off");
        assert_eq!(*recorder.writes.borrow(), vec!["on", "off"]);
    }

    #[test]
    fn dropping_an_unrestored_guard_restores() {
        let recorder = Recorder::with_value("off");
        {
            let _guard = ReadonlyGuard::engage(recorder.clone(), "tank/data").expect("engages");
            assert_eq!(*recorder.value.borrow(), "on");
        }
        assert_eq!(*recorder.value.borrow(), "off");
    }

    #[test]
    fn restore_happens_exactly_once() {
        let recorder = Recorder::with_value("inherited");
        let guard = ReadonlyGuard::engage(recorder.clone(), "tank/data").expect("engages");
        guard.restore().expect("restores");
        assert_eq!(*recorder.writes.borrow(), vec!["on", "inherited"]);
    }
}
