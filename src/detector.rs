use std::path::Path;

/// Manifest kinds we know how to read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Manifest {
    PackageJson,
    GoMod,
    GoVendorModules,
    RequirementsTxt,
}

impl std::fmt::Display for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Manifest::PackageJson => write!(f, "package.json"),
            Manifest::GoMod => write!(f, "go.mod"),
            Manifest::GoVendorModules => write!(f, "vendor/modules.txt"),
            Manifest::RequirementsTxt => write!(f, "requirements.txt"),
        }
    }
}

/// Auto-detect which dependency manifests a project root carries.
/// `go.mod` takes precedence over `vendor/modules.txt`: when both exist
/// they describe the same module set and go.mod is authoritative.
pub fn detect_manifests(path: &Path) -> Vec<Manifest> {
    let mut manifests = Vec::new();

    if path.join("package.json").exists() {
        manifests.push(Manifest::PackageJson);
    }

    if path.join("go.mod").exists() {
        manifests.push(Manifest::GoMod);
    } else if path.join("vendor").join("modules.txt").exists() {
        manifests.push(Manifest::GoVendorModules);
    }

    if path.join("requirements.txt").exists() {
        manifests.push(Manifest::RequirementsTxt);
    }

    manifests
}
