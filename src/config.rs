use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{Discrepancy, Namespace};

/// Hand-maintained exceptions for dependencies whose upstream metadata is
/// missing or ambiguous. Keyed by `namespace/name`.
#[derive(Debug, Deserialize, Default)]
pub struct OverrideTable {
    #[serde(default)]
    pub overrides: HashMap<String, OverrideEntry>,
}

/// One exception entry. `license_spdx` replaces whatever the registry or
/// GitHub reported; `repo_url` fills in a registry entry that has none.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideEntry {
    pub license_spdx: Option<String>,
    pub repo_url: Option<String>,
    /// Why the override exists; carried onto the dependency record.
    pub discrepancy: Option<Discrepancy>,
    /// Free-form operator note, not used programmatically.
    #[allow(dead_code)]
    pub note: Option<String>,
}

impl OverrideTable {
    pub fn get(&self, namespace: Namespace, name: &str) -> Option<&OverrideEntry> {
        self.overrides.get(&format!("{}/{}", namespace, name))
    }

    fn insert(&mut self, key: &str, entry: OverrideEntry) {
        self.overrides.insert(key.to_string(), entry);
    }

    /// Exceptions accumulated from past crawl runs. A file-based table is
    /// merged on top of these.
    pub fn builtin() -> Self {
        fn spdx(id: &str, discrepancy: Discrepancy, note: &str) -> OverrideEntry {
            OverrideEntry {
                license_spdx: Some(id.to_string()),
                repo_url: None,
                discrepancy: Some(discrepancy),
                note: Some(note.to_string()),
            }
        }

        let mut table = OverrideTable::default();
        table.insert(
            "golang/golang/freetype",
            spdx(
                "(FTL OR GPL-2.0)",
                Discrepancy::NonstandardLicense,
                "dual FTL/GPL license text",
            ),
        );
        table.insert(
            "golang/sean-/seed",
            spdx(
                "MIT",
                Discrepancy::NonstandardLicense,
                "hybrid MIT/BSD license file",
            ),
        );
        table.insert(
            "golang/segmentio/backo-go",
            spdx(
                "MIT",
                Discrepancy::NoLicenseFile,
                "license lives inside README.md",
            ),
        );
        table.insert(
            "golang/dgryski/dgoogauth",
            spdx(
                "Apache-2.0",
                Discrepancy::NoLicenseFile,
                "license lives inside README.md",
            ),
        );
        table.insert(
            "golang/certifi/gocertifi",
            spdx(
                "MPL-2.0",
                Discrepancy::NoLicenseFile,
                "LICENSE file is a pointer to the source",
            ),
        );
        table.insert(
            "pypi/backports.tempfile",
            spdx(
                "Python-2.0",
                Discrepancy::NonstandardLicense,
                "nonstandard variant of the PSF license text",
            ),
        );
        table.insert(
            "pypi/cryptography",
            spdx(
                "(Apache-2.0 OR BSD-3-Clause)",
                Discrepancy::NonstandardLicense,
                "complex hybrid license",
            ),
        );
        table.insert(
            "pypi/idna",
            spdx(
                "Python-2.0",
                Discrepancy::NonstandardLicense,
                "complex hybrid license",
            ),
        );
        table.insert(
            "pypi/incremental",
            spdx(
                "MIT",
                Discrepancy::NonstandardLicense,
                "MIT with a long preamble",
            ),
        );
        table.insert(
            "pypi/Brotli",
            spdx(
                "MIT",
                Discrepancy::RegistryInconsistent,
                "inline license is MIT but the registry says Apache-2.0",
            ),
        );
        table.insert(
            "npm/localforage-observable",
            spdx(
                "Apache-2.0",
                Discrepancy::NonstandardLicenseVariant,
                "Apache variant that drifts from the template",
            ),
        );
        table.insert(
            "npm/react-native-document-picker",
            spdx(
                "MIT",
                Discrepancy::RegistryInconsistent,
                "inline license is MIT but the registry says ISC",
            ),
        );
        table.insert(
            "npm/react-native-tableview",
            spdx(
                "BSD-2-Clause",
                Discrepancy::RegistryInconsistent,
                "inline license is BSD but the registry says ISC",
            ),
        );
        table.insert(
            "npm/fuse.js",
            spdx(
                "Apache-2.0",
                Discrepancy::RegistryInconsistent,
                "registry spells the license 'Apache'",
            ),
        );
        table.insert(
            "npm/postcss-modules-scope",
            spdx(
                "MIT",
                Discrepancy::RegistryInconsistent,
                "inline license is MIT but the registry says ISC",
            ),
        );
        table.insert(
            "npm/moment-twitter",
            spdx(
                "MIT",
                Discrepancy::RegistryInconsistent,
                "inline license is MIT but the registry says BSD-2-Clause",
            ),
        );
        table.insert(
            "npm/sjcl",
            spdx(
                "(BSD-2-Clause OR GPL-2.0)",
                Discrepancy::NonstandardLicense,
                "nonstandard combo license",
            ),
        );
        table.insert(
            "npm/react-native-cookies",
            OverrideEntry {
                license_spdx: None,
                repo_url: Some("https://github.com/joeferraro/react-native-cookies".to_string()),
                discrepancy: Some(Discrepancy::RegistryNoRepo),
                note: None,
            },
        );
        table.insert(
            "npm/react-native-section-list-get-item-layout",
            OverrideEntry {
                license_spdx: None,
                repo_url: Some(
                    "https://github.com/jsoendermann/rn-section-list-get-item-layout".to_string(),
                ),
                discrepancy: Some(Discrepancy::RegistryNoRepo),
                note: None,
            },
        );
        table.insert(
            "npm/redux-action-buffer",
            OverrideEntry {
                license_spdx: None,
                repo_url: Some("https://github.com/rt2zz/redux-action-buffer".to_string()),
                discrepancy: Some(Discrepancy::RegistryNoRepo),
                note: None,
            },
        );
        table
    }

    fn merge_from(&mut self, other: OverrideTable) {
        for (key, entry) in other.overrides {
            self.overrides.insert(key, entry);
        }
    }
}

/// Load the override table, searching in order:
///
/// 1. `override_path`, passed via `--overrides`
/// 2. `<first_project>/.notice-crawlr/overrides.toml`
/// 3. `~/.config/notice-crawlr/overrides.toml`
///
/// File entries are layered on top of [`OverrideTable::builtin`].
pub fn load_overrides(first_project: &Path, override_path: Option<&Path>) -> Result<OverrideTable> {
    let mut table = OverrideTable::builtin();

    if let Some(path) = override_path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading override table {}", path.display()))?;
        table.merge_from(toml::from_str(&content)?);
        return Ok(table);
    }

    let project_file = first_project.join(".notice-crawlr").join("overrides.toml");
    if project_file.exists() {
        let content = std::fs::read_to_string(&project_file)?;
        table.merge_from(toml::from_str(&content)?);
        return Ok(table);
    }

    if let Some(home) = dirs::home_dir() {
        let home_file = home
            .join(".config")
            .join("notice-crawlr")
            .join("overrides.toml");
        if home_file.exists() {
            let content = std::fs::read_to_string(&home_file)?;
            table.merge_from(toml::from_str(&content)?);
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_lookup() {
        let table = OverrideTable::builtin();
        let entry = table.get(Namespace::Npm, "fuse.js").unwrap();
        assert_eq!(entry.license_spdx.as_deref(), Some("Apache-2.0"));
        assert!(table.get(Namespace::Npm, "left-pad").is_none());
    }

    #[test]
    fn test_file_overrides_builtin() {
        let toml = r#"
[overrides."npm/fuse.js"]
license_spdx = "MIT"
discrepancy = "registry-inconsistent"

[overrides."golang/acme/widget"]
repo_url = "https://github.com/acme/widget"
discrepancy = "registry-no-repo"
note = "registry entry predates the GitHub move"
"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", toml).unwrap();
        let table = load_overrides(Path::new("/nonexistent"), Some(f.path())).unwrap();

        // file wins over the builtin entry
        let fuse = table.get(Namespace::Npm, "fuse.js").unwrap();
        assert_eq!(fuse.license_spdx.as_deref(), Some("MIT"));

        let widget = table.get(Namespace::Golang, "acme/widget").unwrap();
        assert_eq!(
            widget.repo_url.as_deref(),
            Some("https://github.com/acme/widget")
        );
        assert_eq!(widget.discrepancy, Some(Discrepancy::RegistryNoRepo));

        // builtin entries not mentioned in the file survive the merge
        assert!(table.get(Namespace::Npm, "sjcl").is_some());
    }
}
