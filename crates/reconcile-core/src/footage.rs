//! Footage resolution: reuse, swap in place, or import.
//!
//! Resolution order, first match wins:
//!
//! 1. a media item backed by the same normalized path is reused and reloaded
//! 2. a media item with the shot's name (or the host's range-suffixed form of
//!    it) is kept and its source swapped, falling back to a destructive replace;
//!    items carrying another shot's name are never taken over
//! 3. otherwise the path is imported as a numbered sequence
//!
//! No step raises. A failing step degrades to the next one or to "not found".

use std::collections::BTreeSet;

use aebridge_config_model::paths::{normalize_path, same_path};
use aebridge_host_graph::sequence::is_sequence_name_of;
use aebridge_host_graph::{
    FieldLog, HostGraph, HostGraphExt, ImportOptions, ItemRef, MediaId, MediaInfo,
};
use serde::Serialize;

/// How a media item was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Same path; reloaded in place.
    Reused,
    /// Same name, new path; source swapped in place.
    Swapped,
    /// Same name, new path; swap unavailable, plain replace used.
    Replaced,
    /// Fresh sequence import.
    Imported,
}

/// A shot's footage resolved to a media item for this run.
#[derive(Debug, Clone, Serialize)]
pub struct MediaBinding {
    pub media: MediaId,
    /// Snapshot taken after resolution.
    pub info: MediaInfo,
    pub resolution: Resolution,
    pub writes: FieldLog,
}

impl MediaBinding {
    pub fn item(&self) -> ItemRef {
        ItemRef::Media(self.media)
    }
}

/// Matches desired footage against existing media items.
#[derive(Debug, Clone, Default)]
pub struct FootageResolver {
    /// Shot names in the current config.
    claimed: BTreeSet<String>,
}

impl FootageResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that leaves media named after any of `names` to that shot.
    pub fn claiming<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            claimed: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `media_name` is, or is the sequence form of, a shot other than `name`.
    fn owned_by_other(&self, media_name: &str, name: &str) -> bool {
        self.claimed
            .iter()
            .filter(|other| other.as_str() != name)
            .any(|other| media_name == other || is_sequence_name_of(media_name, other))
    }

    /// Resolve `path` for the shot called `name`; `None` when nothing could be bound.
    pub fn resolve(
        &self,
        host: &mut dyn HostGraph,
        path: &str,
        name: &str,
    ) -> Option<MediaBinding> {
        let path = normalize_path(path.trim());
        if path.is_empty() {
            tracing::warn!(item = name, "Shot has no source path");
            return None;
        }
        let existing = host.media_items();

        if let Some(media) = existing
            .iter()
            .find(|m| m.path.as_deref().is_some_and(|p| same_path(p, &path)))
        {
            let mut writes = FieldLog::new();
            writes.try_apply("reload", || host.reload_media(media.id));
            tracing::debug!(item = name, media = %media.id, "Reusing media with identical path");
            return Some(self.bind(host, media.id, Resolution::Reused, writes));
        }

        let by_name = existing
            .iter()
            .filter(|m| !self.owned_by_other(&m.name, name))
            .find(|m| m.name == name)
            .or_else(|| {
                existing
                    .iter()
                    .filter(|m| !self.owned_by_other(&m.name, name))
                    .find(|m| is_sequence_name_of(&m.name, name))
            });

        if let Some(media) = by_name {
            let mut writes = FieldLog::new();
            let resolution = if writes
                .try_apply("source", || host.replace_with_sequence(media.id, &path))
                .is_applied()
            {
                Resolution::Swapped
            } else if writes
                .try_apply("source", || host.replace_media(media.id, &path))
                .is_applied()
            {
                Resolution::Replaced
            } else {
                tracing::warn!(item = name, path = %path, "Could not relink existing media");
                return None;
            };
            tracing::info!(
                item = name,
                media = %media.id,
                ?resolution,
                "Relinked media to new path"
            );
            writes.try_apply("name", || host.rename_item(media.id.into(), name));
            return Some(self.bind(host, media.id, resolution, writes));
        }

        match host.import_sequence(&path, ImportOptions::NUMBERED_SEQUENCE) {
            Ok(id) => {
                let mut writes = FieldLog::new();
                writes.try_apply("name", || host.rename_item(id.into(), name));
                tracing::info!(item = name, media = %id, path = %path, "Imported footage");
                Some(self.bind(host, id, Resolution::Imported, writes))
            }
            Err(e) => {
                tracing::warn!(item = name, path = %path, error = %e, "Footage import failed");
                None
            }
        }
    }

    fn bind(
        &self,
        host: &dyn HostGraph,
        media: MediaId,
        resolution: Resolution,
        writes: FieldLog,
    ) -> MediaBinding {
        let info = host.media(media).unwrap_or_else(|_| MediaInfo {
            id: media,
            name: String::new(),
            path: None,
            duration: 0.0,
            frame_rate: 0.0,
            is_sequence: false,
        });
        MediaBinding {
            media,
            info,
            resolution,
            writes,
        }
    }
}
