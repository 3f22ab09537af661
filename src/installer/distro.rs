use std::fs;

use serde::Serialize;

const OS_RELEASE: &str = "/etc/os-release";

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Zypper,
}

impl PackageManager {
    pub fn name(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
        }
    }

    /// Arguments after `sudo` that refresh the package index.
    pub fn update_args(self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => &["apt", "update"],
            PackageManager::Dnf => &["dnf", "check-update"],
            PackageManager::Pacman => &["pacman", "-Sy"],
            PackageManager::Zypper => &["zypper", "refresh"],
        }
    }

    /// Arguments after `sudo` that install packages non-interactively.
    pub fn install_args(self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => &["apt", "install", "-y"],
            PackageManager::Dnf => &["dnf", "install", "-y"],
            PackageManager::Pacman => &["pacman", "-S", "--noconfirm"],
            PackageManager::Zypper => &["zypper", "install", "-y"],
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DistroInfo {
    pub name: &'static str,
    pub package_manager: Option<PackageManager>,
}

impl DistroInfo {
    pub fn unknown() -> Self {
        Self {
            name: "Unknown",
            package_manager: None,
        }
    }
}

pub fn detect() -> DistroInfo {
    match fs::read_to_string(OS_RELEASE) {
        Ok(contents) => detect_from_os_release(&contents),
        Err(err) => {
            tracing::warn!(event = "installer.distro_detect_failed", error = %err);
            DistroInfo::unknown()
        }
    }
}

pub fn detect_from_os_release(contents: &str) -> DistroInfo {
    let lowered = contents.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

    let (name, manager) = if has(&["ubuntu", "debian", "mint"]) {
        ("Debian/Ubuntu", PackageManager::Apt)
    } else if has(&["fedora", "rhel", "centos"]) {
        ("Fedora/RHEL", PackageManager::Dnf)
    } else if has(&["arch", "manjaro"]) {
        ("Arch/Manjaro", PackageManager::Pacman)
    } else if has(&["opensuse", "suse"]) {
        ("openSUSE", PackageManager::Zypper)
    } else {
        return DistroInfo::unknown();
    };

    DistroInfo {
        name,
        package_manager: Some(manager),
    }
}
