//! Resolves `!include` directives in a parsed YAML document.
//!
//! An `!include path/to/file` tag is replaced by the contents of that file,
//! read relative to the directory of the document it appears in. Included
//! `.yaml`/`.yml` files are parsed and walked recursively (so an included
//! file can itself `!include` something, relative to its own directory);
//! anything else is spliced in as a plain string.

use crate::ScenarioLoadError;
use std::path::Path;

const INCLUDE_TAG: &str = "!include";

pub(crate) fn resolve(value: serde_yaml::Value, base_dir: &Path) -> Result<serde_yaml::Value, ScenarioLoadError> {
    match value {
        serde_yaml::Value::Tagged(tagged) => {
            if tagged.tag == serde_yaml::value::Tag::new(INCLUDE_TAG) {
                resolve_include(&tagged.value, base_dir)
            } else {
                Ok(serde_yaml::Value::Tagged(tagged))
            }
        }
        serde_yaml::Value::Mapping(map) => {
            let mut resolved = serde_yaml::Mapping::new();
            for (key, value) in map {
                resolved.insert(key, resolve(value, base_dir)?);
            }
            Ok(serde_yaml::Value::Mapping(resolved))
        }
        serde_yaml::Value::Sequence(seq) => Ok(serde_yaml::Value::Sequence(
            seq.into_iter().map(|v| resolve(v, base_dir)).collect::<Result<_, _>>()?,
        )),
        other => Ok(other),
    }
}

fn resolve_include(target: &serde_yaml::Value, base_dir: &Path) -> Result<serde_yaml::Value, ScenarioLoadError> {
    let relative = target
        .as_str()
        .ok_or_else(|| ScenarioLoadError::InvalidInclude("!include target must be a string path".into()))?;
    let path = base_dir.join(relative);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| ScenarioLoadError::IncludeNotFound { path: path.display().to_string(), source: e })?;

    let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
    if is_yaml {
        let included: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ScenarioLoadError::Parse(e.to_string()))?;
        let included_dir = path.parent().unwrap_or(base_dir);
        resolve(included, included_dir)
    } else {
        Ok(serde_yaml::Value::String(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_a_plain_text_include_as_a_string() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("prompt.txt"), "say hello").unwrap();
        let doc = serde_yaml::from_str::<serde_yaml::Value>("prompt: !include prompt.txt\n").unwrap();
        let resolved = resolve(doc, dir.path()).unwrap();
        assert_eq!(resolved["prompt"].as_str(), Some("say hello"));
    }

    #[test]
    fn recursively_resolves_includes_relative_to_the_included_files_own_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("shared")).unwrap();
        std::fs::write(dir.path().join("shared/tools.yaml"), "- name: search\n  description: look things up\n").unwrap();
        let doc = serde_yaml::from_str::<serde_yaml::Value>("tools: !include shared/tools.yaml\n").unwrap();
        let resolved = resolve(doc, dir.path()).unwrap();
        assert_eq!(resolved["tools"][0]["name"].as_str(), Some("search"));
    }

    #[test]
    fn missing_include_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = serde_yaml::from_str::<serde_yaml::Value>("prompt: !include nope.txt\n").unwrap();
        let err = resolve(doc, dir.path()).unwrap_err();
        assert!(matches!(err, ScenarioLoadError::IncludeNotFound { .. }));
    }
}
