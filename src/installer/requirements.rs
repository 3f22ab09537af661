use std::{fs, path::Path};

use serde::Deserialize;

use super::distro::PackageManager;
use super::InstallError;

const BUNDLED: &str = include_str!("../../requirements.toml");
pub const FILE_NAME: &str = "requirements.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    packages: PackageLists,
}

#[derive(Debug, Default, Deserialize)]
struct PackageLists {
    #[serde(default)]
    apt: Vec<String>,
    #[serde(default)]
    dnf: Vec<String>,
    #[serde(default)]
    pacman: Vec<String>,
    #[serde(default)]
    zypper: Vec<String>,
}

impl Requirements {
    pub fn parse(contents: &str) -> Result<Self, InstallError> {
        toml::from_str(contents).map_err(|err| InstallError::Requirements(err.to_string()))
    }

    pub fn bundled() -> Result<Self, InstallError> {
        Self::parse(BUNDLED)
    }

    /// Prefers a `requirements.toml` in `dir`, falling back to the bundled copy.
    pub fn load_from_dir(dir: &Path) -> Result<Self, InstallError> {
        let path = dir.join(FILE_NAME);
        if !path.exists() {
            return Self::bundled();
        }
        tracing::info!(event = "installer.requirements_loaded", path = ?path);
        let contents = fs::read_to_string(&path)?;
        Self::parse(&contents)
    }

    pub fn packages_for(&self, manager: PackageManager) -> &[String] {
        match manager {
            PackageManager::Apt => &self.packages.apt,
            PackageManager::Dnf => &self.packages.dnf,
            PackageManager::Pacman => &self.packages.pacman,
            PackageManager::Zypper => &self.packages.zypper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_file_covers_every_manager() {
        let requirements = Requirements::bundled().expect("bundled requirements");
        for manager in [
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Pacman,
            PackageManager::Zypper,
        ] {
            assert!(
                !requirements.packages_for(manager).is_empty(),
                "{} has no packages",
                manager.name()
            );
        }
    }

    #[test]
    fn local_file_overrides_bundled() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(FILE_NAME),
            "[packages]\npacman = [\"webkit2gtk-4.1\"]\n",
        )
        .expect("write requirements");
        let requirements = Requirements::load_from_dir(dir.path()).expect("load requirements");
        assert_eq!(
            requirements.packages_for(PackageManager::Pacman),
            ["webkit2gtk-4.1".to_string()]
        );
        assert!(requirements.packages_for(PackageManager::Apt).is_empty());
    }

    #[test]
    fn malformed_file_is_reported() {
        let err = Requirements::parse("[packages]\napt = 3").expect_err("invalid toml");
        assert!(matches!(err, InstallError::Requirements(_)));
    }
}
