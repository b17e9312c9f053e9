//! Output-module configuration.
//!
//! Write order is part of the contract:
//!
//! 1. template (named, else the first known fallback template, else a forced format)
//! 2. format settings, fallback route only: channels, depth, color, quality
//! 3. frame numbering start
//! 4. destination file, always last
//!
//! Hosts reset associated settings when the template or destination changes,
//! so anything written after the destination could be lost and anything
//! written before the template is overwritten.

use aebridge_config_model::OutputSpec;
use aebridge_host_graph::{FieldLog, HostGraph, RenderItemId, SettingValue};
use serde::Serialize;

/// Templates tried, in order, when no named template applies.
pub const FALLBACK_TEMPLATES: [&str; 4] = [
    "AEBridge PNG",
    "PNG Sequence with Alpha",
    "PNG Sequence",
    "Lossless with Alpha",
];

/// Format forced when no template applies at all.
pub const FALLBACK_FORMAT: &str = "PNG Sequence";

/// Setting names hosts use for the first output frame number.
pub const NUMBERING_SETTINGS: [&str; 2] = ["Starting #", "Starting Number"];

/// How the output format was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRoute {
    /// The requested template was applied.
    Template,
    /// A known default template was applied.
    FallbackTemplate,
    /// The format was set directly.
    ForcedFormat,
    /// Nothing could be established; no further writes were made.
    Unresolved,
}

/// Result of [`OutputConfigurer::configure`].
#[derive(Debug, Clone, Serialize)]
pub struct OutputOutcome {
    pub success: bool,
    pub route: OutputRoute,
    /// Template that ended up applied, if any.
    pub template: Option<String>,
    pub writes: FieldLog,
}

/// Applies an [`OutputSpec`] to one render item.
#[derive(Debug, Clone)]
pub struct OutputConfigurer<'a> {
    spec: &'a OutputSpec,
    numbering_start: i64,
}

impl<'a> OutputConfigurer<'a> {
    /// `numbering_start` is the first frame number written (the global first frame).
    pub fn new(spec: &'a OutputSpec, numbering_start: i64) -> Self {
        Self {
            spec,
            numbering_start,
        }
    }

    /// Configure `item` to write to `destination`.
    ///
    /// Fails only when neither a template nor the fallback format could be
    /// established; individual field failures are recorded in the outcome.
    pub fn configure(
        &self,
        host: &mut dyn HostGraph,
        item: RenderItemId,
        destination: &str,
    ) -> OutputOutcome {
        let mut writes = FieldLog::new();
        let available = host.output_templates(item).unwrap_or_default();

        if let Some(name) = self.spec.template() {
            let found = available.iter().any(|t| t == name);
            if found
                && writes
                    .try_apply("template", || host.apply_output_template(item, name))
                    .is_applied()
            {
                tracing::debug!(template = name, "Applied output template");
                self.finish(host, item, destination, &mut writes);
                return OutputOutcome {
                    success: true,
                    route: OutputRoute::Template,
                    template: Some(name.to_string()),
                    writes,
                };
            }
            tracing::warn!(
                template = name,
                found,
                "Output template unavailable, using fallback settings"
            );
        }

        let fallback = FALLBACK_TEMPLATES
            .iter()
            .copied()
            .filter(|candidate| available.iter().any(|t| t == candidate))
            .find(|candidate| {
                writes
                    .try_apply("template", || host.apply_output_template(item, candidate))
                    .is_applied()
            });

        let route = match fallback {
            Some(_) => OutputRoute::FallbackTemplate,
            None => {
                let forced = writes.try_apply("format", || {
                    host.set_output_setting(item, "Format", FALLBACK_FORMAT.into())
                });
                if forced.is_applied() {
                    OutputRoute::ForcedFormat
                } else {
                    tracing::warn!(%item, "No output template or format could be established");
                    return OutputOutcome {
                        success: false,
                        route: OutputRoute::Unresolved,
                        template: None,
                        writes,
                    };
                }
            }
        };

        let spec = self.spec;
        writes.try_apply("channels", || {
            host.set_output_setting(item, "Channels", spec.channels.as_str().into())
        });
        writes.try_apply("depth", || {
            host.set_output_setting(item, "Depth", spec.depth.as_str().into())
        });
        writes.try_apply("color", || {
            host.set_output_setting(item, "Color", spec.effective_color_mode().into())
        });
        writes.try_apply("quality", || {
            host.set_output_setting(item, "Quality", SettingValue::Number(spec.quality))
        });

        self.finish(host, item, destination, &mut writes);
        OutputOutcome {
            success: true,
            route,
            template: fallback.map(String::from),
            writes,
        }
    }

    /// Numbering start, then the destination file last.
    fn finish(
        &self,
        host: &mut dyn HostGraph,
        item: RenderItemId,
        destination: &str,
        writes: &mut FieldLog,
    ) {
        for key in NUMBERING_SETTINGS {
            let outcome = writes.try_apply("numbering", || {
                host.set_output_setting(item, key, self.numbering_start.into())
            });
            if outcome.is_applied() {
                break;
            }
        }
        writes.try_apply("file", || host.set_output_file(item, destination));
    }
}
