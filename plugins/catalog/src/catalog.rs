use crate::manifest::{is_manifest, parse_manifest};
use log::{debug, warn};
use refwatch_core::plugin::ModuleRegistry;
use refwatch_core::types::{CategoryFilter, Module, ModuleCategory};
use refwatch_core::{AuditError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Module registry backed by a directory of manifests laid out as
/// `<root>/<category>/**/<module>.{yml,yaml,json}`.
///
/// A module's full name is its path relative to the root without the extension,
/// e.g. `exploit/windows/smb/ms08_067_netapi`.
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(AuditError::Catalog {
                message: format!("module catalog directory not found: {}", root.display()),
            });
        }
        Ok(Self { root })
    }

    fn full_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?.with_extension("");
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }

    fn load_module(&self, category: ModuleCategory, path: &Path) -> Option<Module> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        let manifest = match parse_manifest(path, &content) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        let full_name = match manifest.name.clone() {
            Some(name) => name,
            None => self.full_name(path)?,
        };

        Some(Module {
            full_name,
            category,
            references: manifest.references(),
        })
    }

    fn category_modules(&self, category: ModuleCategory) -> impl Iterator<Item = Module> + '_ {
        let dir = self.root.join(category.as_str());
        if !dir.is_dir() {
            debug!("No {} modules under {}", category, self.root.display());
        }

        WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_manifest(entry.path()))
            .filter_map(move |entry| self.load_module(category, entry.path()))
    }
}

impl ModuleRegistry for DirectoryCatalog {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn modules<'a>(
        &'a self,
        filter: &CategoryFilter,
    ) -> Result<Box<dyn Iterator<Item = Module> + 'a>> {
        let categories = filter.categories();
        Ok(Box::new(
            categories
                .into_iter()
                .flat_map(move |category| self.category_modules(category)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn catalog_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "exploit/windows/smb/ms08_067_netapi.yml",
            "references:\n  - { kind: CVE, value: 2008-4250 }\n  - { kind: MSB, value: MS08-067 }\n",
        );
        write(
            dir.path(),
            "exploit/unix/webapp/wp_admin.json",
            r#"{"references": [{"kind": "WPVDB", "value": 7777}]}"#,
        );
        write(
            dir.path(),
            "post/windows/gather/hashdump.yaml",
            "name: post/windows/gather/smart_hashdump\nreferences:\n  - { kind: URL, value: \"http://example.test/hashdump\" }\n",
        );
        write(dir.path(), "exploit/README.md", "not a manifest");
        dir
    }

    fn names(catalog: &DirectoryCatalog, filter: &CategoryFilter) -> Vec<String> {
        catalog.modules(filter).unwrap().map(|m| m.full_name).collect()
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(DirectoryCatalog::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_enumerates_in_stable_order() {
        let dir = catalog_fixture();
        let catalog = DirectoryCatalog::new(dir.path()).unwrap();

        let expected = vec![
            "exploit/unix/webapp/wp_admin",
            "exploit/windows/smb/ms08_067_netapi",
            "post/windows/gather/smart_hashdump",
        ];
        assert_eq!(names(&catalog, &CategoryFilter::All), expected);
        assert_eq!(names(&catalog, &CategoryFilter::All), expected);
    }

    #[test]
    fn test_category_filter_limits_walk() {
        let dir = catalog_fixture();
        let catalog = DirectoryCatalog::new(dir.path()).unwrap();

        let posts = names(&catalog, &CategoryFilter::Only(vec![ModuleCategory::Post]));
        assert_eq!(posts, vec!["post/windows/gather/smart_hashdump"]);

        let nops = names(&catalog, &CategoryFilter::Only(vec![ModuleCategory::Nop]));
        assert!(nops.is_empty());
    }

    #[test]
    fn test_module_references_and_category() {
        let dir = catalog_fixture();
        let catalog = DirectoryCatalog::new(dir.path()).unwrap();

        let module = catalog
            .modules(&CategoryFilter::All)
            .unwrap()
            .find(|m| m.full_name.ends_with("ms08_067_netapi"))
            .unwrap();
        assert_eq!(module.category, ModuleCategory::Exploit);
        let labels: Vec<String> = module.references.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["CVE-2008-4250", "MSB-MS08-067"]);
    }

    #[test]
    fn test_broken_manifest_is_skipped() {
        let dir = catalog_fixture();
        write(dir.path(), "exploit/aaa_broken.json", "{ not json");
        let catalog = DirectoryCatalog::new(dir.path()).unwrap();

        let exploits = names(&catalog, &CategoryFilter::Only(vec![ModuleCategory::Exploit]));
        assert_eq!(exploits.len(), 2);
        assert!(!exploits.iter().any(|n| n.contains("broken")));
    }
}
