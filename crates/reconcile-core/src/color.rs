//! Project-level color workflow policy.
//!
//! Tiers are tried in order and the first one whose anchor write lands wins.
//! Nothing here is fatal: a host that accepts none of the tiers simply keeps
//! its own color settings.

use aebridge_config_model::{ColorConfig, ColorFamily};
use aebridge_host_graph::{FieldLog, HostGraph, SettingValue};
use serde::Serialize;

/// ICC profile used as the working space outside OCIO.
pub const ICC_WORKING_SPACE: &str = "sRGB IEC61966-2.1";

/// OCIO working space for ACES shots.
pub const OCIO_WORKING_SPACE: &str = "ACEScg";

/// Which tier ended up configuring the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTier {
    Ocio,
    Icc,
    DepthOnly,
    /// No tier could be applied.
    Untouched,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorOutcome {
    pub tier: ColorTier,
    pub family: ColorFamily,
    pub writes: FieldLog,
}

/// Chooses and applies project color settings for a [`ColorConfig`].
#[derive(Debug, Clone)]
pub struct ColorPolicy<'a> {
    config: &'a ColorConfig,
}

impl<'a> ColorPolicy<'a> {
    pub fn new(config: &'a ColorConfig) -> Self {
        Self { config }
    }

    /// Bits per channel the project should run at.
    pub fn bit_depth(&self) -> i64 {
        if self.config.is_scene_linear() {
            32
        } else {
            16
        }
    }

    pub fn apply(&self, host: &mut dyn HostGraph) -> ColorOutcome {
        let mut writes = FieldLog::new();
        let family = self.config.family();

        let tier = if self.config.wants_aces() && self.ocio(host, &mut writes) {
            ColorTier::Ocio
        } else if self.icc(host, &mut writes) {
            ColorTier::Icc
        } else if writes
            .try_apply("bits_per_channel", || {
                host.set_project_setting("Bits Per Channel", self.bit_depth().into())
            })
            .is_applied()
        {
            ColorTier::DepthOnly
        } else {
            ColorTier::Untouched
        };

        match tier {
            ColorTier::Untouched => {
                tracing::warn!(?family, "Host accepted no project color settings")
            }
            _ => tracing::info!(?tier, ?family, "Applied project color policy"),
        }
        ColorOutcome {
            tier,
            family,
            writes,
        }
    }

    fn ocio(&self, host: &mut dyn HostGraph, writes: &mut FieldLog) -> bool {
        let anchor = writes.try_apply("color_engine", || {
            host.set_project_setting("Color Engine", "OCIO".into())
        });
        if !anchor.is_applied() {
            return false;
        }
        writes.try_apply("working_space", || {
            host.set_project_setting("OCIO Working Space", OCIO_WORKING_SPACE.into())
        });
        writes.try_apply("bits_per_channel", || {
            host.set_project_setting("Bits Per Channel", SettingValue::Number(32.0))
        });
        true
    }

    fn icc(&self, host: &mut dyn HostGraph, writes: &mut FieldLog) -> bool {
        let anchor = writes.try_apply("working_space", || {
            host.set_project_setting("Working Space", ICC_WORKING_SPACE.into())
        });
        if !anchor.is_applied() {
            return false;
        }
        let linear = self.config.is_scene_linear();
        writes.try_apply("linearize", || {
            host.set_project_setting("Linearize Working Space", linear.into())
        });
        writes.try_apply("bits_per_channel", || {
            host.set_project_setting("Bits Per Channel", self.bit_depth().into())
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aebridge_host_graph::{ApplyOutcome, HostOptions, MemoryHost};

    fn config(colorspace: &str, aces: bool) -> ColorConfig {
        ColorConfig {
            colorspace: colorspace.to_string(),
            aces_compliant: aces,
            ..ColorConfig::default()
        }
    }

    fn ocio_host() -> MemoryHost {
        let mut options = HostOptions::default();
        options
            .project_setting_keys
            .extend(["Color Engine".to_string(), "OCIO Working Space".to_string()]);
        MemoryHost::with_options(options)
    }

    #[test]
    fn linear_shots_get_linearized_icc_workflow() {
        let mut host = MemoryHost::new();
        let outcome = ColorPolicy::new(&config("scene_linear", false)).apply(&mut host);

        assert_eq!(outcome.tier, ColorTier::Icc);
        let settings = &host.project().settings;
        assert_eq!(settings.get("Linearize Working Space"), Some(&SettingValue::Bool(true)));
        assert_eq!(settings.get("Bits Per Channel"), Some(&SettingValue::Number(32.0)));
    }

    #[test]
    fn srgb_shots_stay_display_referred() {
        let mut host = MemoryHost::new();
        let outcome = ColorPolicy::new(&config("sRGB", false)).apply(&mut host);

        assert_eq!(outcome.family, ColorFamily::Srgb);
        let settings = &host.project().settings;
        assert_eq!(settings.get("Linearize Working Space"), Some(&SettingValue::Bool(false)));
        assert_eq!(settings.get("Bits Per Channel"), Some(&SettingValue::Number(16.0)));
    }

    #[test]
    fn aces_without_ocio_falls_back_to_icc() {
        let mut host = MemoryHost::new();
        let outcome = ColorPolicy::new(&config("ACES - ACEScg", false)).apply(&mut host);

        assert_eq!(outcome.tier, ColorTier::Icc);
        assert_eq!(outcome.writes.outcome("color_engine"), Some(ApplyOutcome::Failed));
    }

    #[test]
    fn aces_with_ocio_host() {
        let mut host = ocio_host();
        let outcome = ColorPolicy::new(&config("linear", true)).apply(&mut host);

        assert_eq!(outcome.tier, ColorTier::Ocio);
        assert_eq!(
            outcome.writes.order(),
            vec!["color_engine", "working_space", "bits_per_channel"]
        );
        assert_eq!(
            host.project().settings.get("OCIO Working Space"),
            Some(&SettingValue::from("ACEScg"))
        );
    }

    #[test]
    fn non_aces_never_touches_ocio() {
        let mut host = ocio_host();
        let outcome = ColorPolicy::new(&config("linear", false)).apply(&mut host);
        assert_eq!(outcome.tier, ColorTier::Icc);
        assert!(host.project().settings.get("Color Engine").is_none());
    }

    #[test]
    fn depth_only_and_untouched_tiers() {
        let mut host =
            MemoryHost::with_options(HostOptions::default().rejecting("project.Working Space"));
        let outcome = ColorPolicy::new(&config("linear", false)).apply(&mut host);
        assert_eq!(outcome.tier, ColorTier::DepthOnly);

        let mut host = MemoryHost::with_options(
            HostOptions::default()
                .rejecting("project.Working Space")
                .rejecting("project.Bits Per Channel"),
        );
        let outcome = ColorPolicy::new(&config("linear", false)).apply(&mut host);
        assert_eq!(outcome.tier, ColorTier::Untouched);
        assert!(host.project().settings.is_empty());
    }
}
