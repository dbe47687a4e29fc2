use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use scriptline::{
    BoxError, ExternalResolver, Report, ReportSeverity, ResolvedDependencies,
    ScriptContents, to_legacy_position,
};

pub const DEPENDS_ON: &str = "depends_on";
pub const REPOSITORY: &str = "repository";

/// Environment variable holding the directory of the running script.
pub const SCRIPT_DIR: &str = "SCRIPT_DIR";

/// Resolves `@depends_on` paths against the local file system.
///
/// Each path is tried under every `@repository` directory in order, then
/// under `SCRIPT_DIR`; absolute paths are used as they are. Relative
/// repositories are themselves taken relative to `SCRIPT_DIR` when it is
/// set. Resolved files are also imported as packages named by their stem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl FileResolver {
    fn candidates(
        path: &str,
        repositories: &[PathBuf],
        script_dir: Option<&Path>,
    ) -> Vec<PathBuf> {
        let path = Path::new(path);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }
        repositories
            .iter()
            .map(|repository| repository.join(path))
            .chain(script_dir.map(|dir| dir.join(path)))
            .collect()
    }
}

/// A resolved library file is imported under its stem. Directories import
/// nothing by name.
fn package_name(found: &Path) -> Option<String> {
    if !found.is_file() {
        return None;
    }
    found
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

#[async_trait]
impl ExternalResolver for FileResolver {
    async fn resolve(
        &self,
        contents: &ScriptContents<'_>,
        environment: &HashMap<String, String>,
        report: &mut Report<'_>,
        _previous: Option<&ResolvedDependencies>,
    ) -> Result<Option<ResolvedDependencies>, BoxError> {
        let script_dir = environment.get(SCRIPT_DIR).map(Path::new);
        let repositories: Vec<PathBuf> = contents
            .annotations
            .iter()
            .filter(|annotation| annotation.name == REPOSITORY)
            .flat_map(|annotation| &annotation.arguments)
            .map(|repository| match script_dir {
                Some(dir) => dir.join(repository),
                None => PathBuf::from(repository),
            })
            .collect();

        let mut requested = false;
        let mut classpath = Vec::new();
        let mut imported_packages: Vec<String> = Vec::new();
        for annotation in contents
            .annotations
            .iter()
            .filter(|annotation| annotation.name == DEPENDS_ON)
        {
            requested = true;
            for path in &annotation.arguments {
                let candidates = Self::candidates(path, &repositories, script_dir);
                match candidates.into_iter().find(|candidate| candidate.exists()) {
                    Some(found) => {
                        log::debug!("resolved {path} to {}", found.display());
                        if let Some(package) = package_name(&found) {
                            if !imported_packages.contains(&package) {
                                imported_packages.push(package);
                            }
                        }
                        classpath.push(found);
                    }
                    None => report(
                        ReportSeverity::Error,
                        &format!("dependency not found: {path}"),
                        to_legacy_position(annotation.location),
                    ),
                }
            }
        }

        if !requested {
            return Ok(None);
        }
        Ok(Some(ResolvedDependencies {
            classpath,
            imported_packages,
        }))
    }
}
