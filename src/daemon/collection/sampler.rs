use tracing::{debug, warn};

use crate::{
    tracking::{
        error::TrackingError,
        store::{Sample, UsageStore},
    },
    window_api::{icons::IconProvider, ApplicationObservation, ForegroundResolver},
};

/// Turns what the resolver sees into a [Sample]. Never fails, an unresolvable foreground becomes
/// the unknown application.
pub struct Sampler {
    resolver: Box<dyn ForegroundResolver>,
    icons: Box<dyn IconProvider>,
}

impl Sampler {
    pub fn new(resolver: Box<dyn ForegroundResolver>, icons: Box<dyn IconProvider>) -> Self {
        Self { resolver, icons }
    }

    fn observe(&mut self) -> ApplicationObservation {
        match self.resolver.current_foreground_app() {
            Ok(observation) => observation,
            Err(e) => {
                let e = TrackingError::ResolverUnavailable(format!("{e:#}"));
                warn!("{e}");
                ApplicationObservation::unknown()
            }
        }
    }

    pub fn sample(&mut self, store: &UsageStore) -> Sample {
        let ApplicationObservation {
            identifier,
            executable_path,
        } = self.observe();

        // Icons only matter when focus moves to an app that has none yet.
        let is_switch = store
            .current_session()
            .is_none_or(|v| v.app != identifier);
        let icon_reference = if is_switch && store.needs_icon(&identifier) {
            self.icons.icon_for(&identifier, executable_path.as_deref())
        } else {
            None
        };
        debug!("Sampled {identifier}");

        Sample {
            app: identifier,
            executable_path,
            icon_reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::{
        tracking::store::{Sample, UsageStore},
        window_api::{
            icons::{IconProvider, NoIcons},
            ApplicationObservation, MockForegroundResolver, UNKNOWN_APPLICATION,
        },
    };

    use super::Sampler;

    struct FixedIcon;

    impl IconProvider for FixedIcon {
        fn icon_for(&self, identifier: &str, _: Option<&Path>) -> Option<PathBuf> {
            Some(PathBuf::from(format!("icons/{identifier}.png")))
        }
    }

    #[test]
    fn test_resolver_failure_becomes_unknown() {
        let mut resolver = MockForegroundResolver::new();
        resolver
            .expect_current_foreground_app()
            .returning(|| Err(anyhow!("access denied")));
        let mut sampler = Sampler::new(Box::new(resolver), Box::new(NoIcons));

        let sample = sampler.sample(&UsageStore::default());

        assert_eq!(&*sample.app, UNKNOWN_APPLICATION);
        assert_eq!(sample.executable_path, None);
    }

    #[test]
    fn test_icon_is_looked_up_on_switch_only() {
        let mut resolver = MockForegroundResolver::new();
        resolver.expect_current_foreground_app().returning(|| {
            Ok(ApplicationObservation::from_executable(PathBuf::from(
                "/usr/bin/nvim",
            )))
        });
        let mut sampler = Sampler::new(Box::new(resolver), Box::new(FixedIcon));
        let store = UsageStore::default();

        let first = sampler.sample(&store);
        assert_eq!(
            first,
            Sample {
                app: "nvim".into(),
                executable_path: Some("/usr/bin/nvim".into()),
                icon_reference: Some("icons/nvim.png".into()),
            }
        );

        store.apply_sample(first, &Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap());
        assert_eq!(sampler.sample(&store).icon_reference, None);
    }
}
