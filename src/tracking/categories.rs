//! Structural operations on categories. Each operation validates its input before touching
//! anything, so an error always leaves the state as it was.

use chrono::{DateTime, Duration, TimeZone};
use tracing::info;

use super::{
    error::TrackingError,
    state::{AppId, UsageState, UNCATEGORIZED},
    store::UsageStore,
};

impl UsageState {
    pub fn create_category(&mut self, name: &str) -> Result<(), TrackingError> {
        if self.categories.contains_key(name) {
            return Err(TrackingError::DuplicateCategory(name.into()));
        }
        self.categories.insert(name.into(), Duration::zero());
        Ok(())
    }

    /// Relabels a category, keeping its total, and repoints every app that referenced it.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<(), TrackingError> {
        if !self.categories.contains_key(old) {
            return Err(TrackingError::UnknownCategory(old.into()));
        }
        if old == UNCATEGORIZED {
            return Err(TrackingError::ProtectedCategory(old.into()));
        }
        if self.categories.contains_key(new) {
            return Err(TrackingError::DuplicateCategory(new.into()));
        }

        let total = self.categories.remove(old).unwrap_or_else(Duration::zero);
        self.categories.insert(new.into(), total);
        self.repoint_apps(old, new);
        Ok(())
    }

    /// Removes a category. Its apps and their time move to [UNCATEGORIZED].
    pub fn delete_category(&mut self, name: &str) -> Result<(), TrackingError> {
        if name == UNCATEGORIZED {
            return Err(TrackingError::ProtectedCategory(name.into()));
        }
        let Some(total) = self.categories.remove(name) else {
            return Err(TrackingError::UnknownCategory(name.into()));
        };

        *self
            .categories
            .entry(UNCATEGORIZED.into())
            .or_insert_with(Duration::zero) += total;
        self.repoint_apps(name, UNCATEGORIZED);
        Ok(())
    }

    fn repoint_apps(&mut self, from: &str, to: &str) {
        for record in self.apps.values_mut().filter(|v| v.category == from) {
            record.category = to.into();
        }
    }
}

impl UsageStore {
    pub fn create_category(&self, name: &str) -> Result<(), TrackingError> {
        self.lock().state.create_category(name)?;
        info!("Created category {name:?}");
        Ok(())
    }

    pub fn rename_category(&self, old: &str, new: &str) -> Result<(), TrackingError> {
        self.lock().state.rename_category(old, new)?;
        info!("Renamed category {old:?} to {new:?}");
        Ok(())
    }

    pub fn delete_category(&self, name: &str) -> Result<(), TrackingError> {
        self.lock().state.delete_category(name)?;
        info!("Deleted category {name:?}");
        Ok(())
    }

    /// Moves `app` into an existing `category`. When `app` is focused right now its in-flight
    /// time is committed first, so the moved total includes it.
    pub fn reassign_category<Tz: TimeZone>(
        &self,
        app: &str,
        category: &str,
        now: &DateTime<Tz>,
    ) -> Result<(), TrackingError> {
        let mut inner = self.lock();
        if !inner.state.categories.contains_key(category) {
            return Err(TrackingError::UnknownCategory(category.into()));
        }
        inner.checkpoint(app, now);
        let app: AppId = app.into();
        inner.state.set_category(&app, category)?;
        info!("Assigned {app} to {category:?}");
        Ok(())
    }

    /// Creates `name` and moves `app` into it in one step.
    pub fn create_and_assign<Tz: TimeZone>(
        &self,
        app: &str,
        name: &str,
        now: &DateTime<Tz>,
    ) -> Result<(), TrackingError> {
        let mut inner = self.lock();
        inner.state.create_category(name)?;
        inner.checkpoint(app, now);
        let app: AppId = app.into();
        inner.state.set_category(&app, name)?;
        info!("Created category {name:?} for {app}");
        Ok(())
    }
}
