use crate::err::GoldenError;
use crate::metafile::{MetafileFactory, MetafileHandle};
use crate::settings::CheckSettings;

use log::{debug, info};
use serde::Serialize;

use std::borrow::Cow;
use std::fs;
use std::path::PathBuf;

/// What to do with reference ("golden") copies of the metafiles under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GoldenMode {
    #[default]
    Off,
    /// Write the bytes of every checked handle to the golden directory.
    Save,
    /// Check the golden copy instead of the handle that was produced.
    Load,
}

/// The handle a check should run against, after applying the golden mode.
#[derive(Debug)]
pub enum GoldenHandle<'h, H> {
    Original(&'h H),
    Loaded(H),
}

impl<'h, H: MetafileHandle> GoldenHandle<'h, H> {
    pub fn get(&self) -> &H {
        match self {
            GoldenHandle::Original(h) => *h,
            GoldenHandle::Loaded(h) => h,
        }
    }
}

fn golden_path(settings: &CheckSettings, name: &str) -> Result<PathBuf, GoldenError> {
    let dir = settings.get_golden_dir().ok_or(GoldenError::NoDirectory)?;
    if name.is_empty() {
        return Err(GoldenError::MissingName);
    }
    let path = dir.join(name);
    Ok(match path.extension() {
        Some(_) => path,
        None => path.with_extension("emf"),
    })
}

/// Applies the golden mode of `settings` to `handle`.
///
/// In `Save` mode the raw bytes of `handle` are written to `<golden dir>/<name>` and the handle
/// is returned unchanged. In `Load` mode that file is read back and wrapped by `factory`.
/// `.emf` is appended to `name` when it has no extension. An empty `name` is rejected.
pub fn sync_golden<'h, F: MetafileFactory>(
    handle: &'h F::Handle,
    factory: &F,
    name: &str,
    settings: &CheckSettings,
) -> Result<GoldenHandle<'h, F::Handle>, GoldenError> {
    match settings.get_golden_mode() {
        GoldenMode::Off => Ok(GoldenHandle::Original(handle)),
        GoldenMode::Save => {
            let path = golden_path(settings, name)?;
            let bytes: Cow<'_, [u8]> = handle.raw_bytes()?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| GoldenError::Io {
                    action: "create directory for",
                    path: path.clone(),
                    source,
                })?;
            }

            fs::write(&path, &bytes).map_err(|source| GoldenError::Io {
                action: "write",
                path: path.clone(),
                source,
            })?;

            info!("saved {} bytes to {}", bytes.len(), path.display());
            Ok(GoldenHandle::Original(handle))
        }
        GoldenMode::Load => {
            let path = golden_path(settings, name)?;
            let bytes = fs::read(&path).map_err(|source| GoldenError::Io {
                action: "read",
                path: path.clone(),
                source,
            })?;

            debug!("loaded {} bytes from {}", bytes.len(), path.display());
            Ok(GoldenHandle::Loaded(factory.wrap_raw_bytes(&bytes)?))
        }
    }
}
