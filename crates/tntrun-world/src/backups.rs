use std::fs;
use std::path::{Path, PathBuf};

use tntrun_host::Host;
use tntrun_types::{Location, PlayerId};
use tracing::{debug, info, warn};

use crate::{copy_world_dir, WorldError};

/// Snapshots and restores arena world directories.
///
/// Live worlds are at `<worlds_dir>/<world>`, snapshots at
/// `<backups_dir>/<world>`.
#[derive(Debug, Clone)]
pub struct WorldBackups {
    worlds_dir: PathBuf,
    backups_dir: PathBuf,
}

impl WorldBackups {
    /// Neither directory has to exist yet.
    pub fn new(worlds_dir: impl Into<PathBuf>, backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            worlds_dir: worlds_dir.into(),
            backups_dir: backups_dir.into(),
        }
    }

    /// Live directory of `world`.
    pub fn world_path(&self, world: &str) -> PathBuf {
        self.worlds_dir.join(world)
    }

    /// Snapshot directory of `world`.
    pub fn backup_path(&self, world: &str) -> PathBuf {
        self.backups_dir.join(world)
    }

    /// Whether a complete snapshot of `world` exists.
    pub fn has_backup(&self, world: &str) -> bool {
        self.backup_path(world).is_dir()
    }

    /// Where a new snapshot is copied before it replaces the old one.
    pub fn staging_path(&self, world: &str) -> PathBuf {
        self.backups_dir.join(format!("{world}.partial"))
    }

    /// Replaces the snapshot of `world` with its current state.
    ///
    /// A loaded world is saved first so the snapshot includes in-memory
    /// changes. The copy goes to a staging directory and only replaces the
    /// previous snapshot once it is complete; on any copy error the
    /// previous snapshot is left as it was.
    pub fn backup(&self, host: &mut (impl Host + ?Sized), world: &str) -> Result<(), WorldError> {
        if host.is_world_loaded(world) {
            host.save_world(world)?;
        }

        let source = self.world_path(world);
        let staging = self.staging_path(world);
        let target = self.backup_path(world);
        remove_dir_if_present(&staging)?;
        let files = match copy_world_dir(&source, &staging) {
            Ok(files) => files,
            Err(e) => {
                if let Err(cleanup) = remove_dir_if_present(&staging) {
                    warn!(%world, error = %cleanup, "could not remove partial backup");
                }
                return Err(e);
            }
        };

        remove_dir_if_present(&target)?;
        fs::rename(&staging, &target).map_err(|e| WorldError::io(&target, e))?;

        info!(%world, files, backup = %target.display(), "world backup written");
        Ok(())
    }

    /// Replaces the live `world` with its snapshot and loads it.
    ///
    /// Refuses to touch an occupied world: every player still inside is
    /// sent to `home(player)`, or to the server default spawn when that
    /// returns `None`, and [`WorldError::Occupied`] is returned.
    pub fn restore(
        &self,
        host: &mut (impl Host + ?Sized),
        world: &str,
        home: impl Fn(&PlayerId) -> Option<Location>,
    ) -> Result<(), WorldError> {
        let backup = self.backup_path(world);
        if !backup.is_dir() {
            return Err(WorldError::MissingBackup(world.to_string()));
        }

        let stragglers = host.players_in_world(world);
        if !stragglers.is_empty() {
            for player in &stragglers {
                let target = home(player)
                    .filter(|loc| loc.world != world)
                    .unwrap_or_else(|| host.default_spawn());
                if let Err(e) = host.teleport(player, &target) {
                    warn!(%world, %player, error = %e, "could not move player out of arena world");
                }
            }
            return Err(WorldError::Occupied {
                world: world.to_string(),
                count: stragglers.len(),
            });
        }

        if host.is_world_loaded(world) {
            host.save_world(world)?;
            host.unload_world(world)?;
            debug!(%world, "world unloaded for restore");
        }

        let live = self.world_path(world);
        remove_dir_if_present(&live)?;
        copy_world_dir(&backup, &live)?;
        host.load_world(world)?;

        info!(%world, "world restored from backup");
        Ok(())
    }
}

fn remove_dir_if_present(path: &Path) -> Result<(), WorldError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| WorldError::io(path, e))?;
    }
    Ok(())
}
