//! Idempotent patch of the host project's `tsconfig.json`.
//!
//! Adds the `~restate` path aliases and the include globs the generated
//! files need, both pointing at the configured output directory. The file is treated as text (it is usually JSONC with
//! comments and trailing commas), so only the two touched blocks change.

use std::path::Path;

use regex::{Captures, Regex};

use crate::error::{GenError, GenResult};
use crate::utils::{relative_path, to_module_path, write_atomic};

const TSCONFIG_FILE: &str = "tsconfig.json";

/// The alias and include lines for one output directory.
struct Entries {
    paths: String,
    includes: [String; 3],
}

impl Entries {
    /// `output_dir` is relative to the directory holding `tsconfig.json`.
    fn new(output_dir: &Path) -> Self {
        let dir = to_module_path(output_dir);
        Self {
            paths: format!(
                "\"~restate\": [\"./{dir}/index.ts\"],\n      \"~restate/*\": [\"./{dir}/*\"]"
            ),
            includes: [
                "\"**/*.ts\"".to_string(),
                "\"./**/*.ts\"".to_string(),
                format!("\"./{dir}/**/*.ts\""),
            ],
        }
    }

    fn is_applied(&self, content: &str) -> bool {
        content.contains("\"~restate\"")
            && content.contains("\"~restate/*\"")
            && self.includes.iter().all(|e| content.contains(e.as_str()))
    }
}

/// Return the patched text, or `None` if every entry is already present.
pub fn patch_tsconfig(content: &str, output_dir: &Path) -> GenResult<Option<String>> {
    let entries = Entries::new(output_dir);
    if entries.is_applied(content) {
        return Ok(None);
    }

    let paths_re = compile(r#"("paths"\s*:\s*\{)([\s\S]*?)(\s*\})"#)?;
    let compiler_options_re = compile(r#""compilerOptions"\s*:\s*\{"#)?;
    let include_re = compile(r#"("include"\s*:\s*\[)([\s\S]*?)(\s*\])"#)?;

    let mut patched = if paths_re.is_match(content) {
        paths_re
            .replacen(content, 1, |caps: &Captures| {
                let mut body = caps[2].to_string();
                if !body.contains("\"~restate\"") {
                    body = body.trim_end().trim_end_matches(',').to_string();
                    if !body.is_empty() {
                        body.push(',');
                    }
                    body.push_str("\n      ");
                    body.push_str(&entries.paths);
                }
                format!("{}{}{}", &caps[1], body.trim_end_matches('\n'), &caps[3])
            })
            .into_owned()
    } else if let Some(m) = compiler_options_re.find(content) {
        format!(
            "{}\n    \"paths\": {{\n      {}\n    }},{}",
            &content[..m.end()],
            entries.paths,
            &content[m.end()..]
        )
    } else {
        content.to_string()
    };

    if include_re.is_match(&patched) {
        patched = include_re
            .replacen(&patched, 1, |caps: &Captures| {
                let mut elements: Vec<String> = caps[2]
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect();
                for required in &entries.includes {
                    if !elements.contains(required) {
                        elements.push(required.clone());
                    }
                }
                format!("{}\n    {}\n{}", &caps[1], elements.join(",\n    "), &caps[3])
            })
            .into_owned();
    } else {
        let trimmed = patched.trim_end();
        if let Some(without_brace) = trimmed.strip_suffix('}') {
            patched = format!(
                "{},\n  \"include\": [\n    {}\n  ]\n}}\n",
                without_brace.trim_end(),
                entries.includes.join(",\n    ")
            );
        }
    }

    patched = patched.replace("}\n,", "},");
    Ok((patched != content).then_some(patched))
}

/// Apply [`patch_tsconfig`] to `<root>/tsconfig.json`.
///
/// `output_dir` may be relative to `root` or absolute. Returns whether the
/// file was rewritten.
pub fn update_tsconfig(root: &Path, output_dir: &Path) -> GenResult<bool> {
    let path = root.join(TSCONFIG_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| GenError::io(&path, e))?;
    let output_dir = relative_path(root, &root.join(output_dir));

    match patch_tsconfig(&content, &output_dir)? {
        Some(patched) => {
            write_atomic(&path, &patched)?;
            crate::log_event!("tsconfig", "patched", "{}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

fn compile(pattern: &str) -> GenResult<Regex> {
    Regex::new(pattern).map_err(|source| GenError::Pattern { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn patch(content: &str) -> Option<String> {
        patch_tsconfig(content, Path::new("restate.gen")).unwrap()
    }

    const ENCORE_TSCONFIG: &str = r#"{
  "$schema": "https://json.schemastore.org/tsconfig",
  "compilerOptions": {
    "lib": ["ES2022"],
    "target": "ES2022",
    "module": "ES2022",
    "paths": {
      "~encore/*": ["./encore.gen/*"]
    }
  }
}
"#;

    #[test]
    fn test_adds_paths_and_include() {
        let patched = patch(ENCORE_TSCONFIG).unwrap();

        assert!(patched.contains("\"~encore/*\": [\"./encore.gen/*\"],"));
        assert!(patched.contains("\"~restate\": [\"./restate.gen/index.ts\"]"));
        assert!(patched.contains("\"~restate/*\": [\"./restate.gen/*\"]"));
        assert!(patched.contains("\"include\": ["));
        for entry in ["\"**/*.ts\"", "\"./**/*.ts\"", "\"./restate.gen/**/*.ts\""] {
            assert!(patched.contains(entry), "missing {entry}");
        }
    }

    #[test]
    fn test_patch_is_idempotent() {
        let once = patch(ENCORE_TSCONFIG).unwrap();
        assert!(patch(&once).is_none());
    }

    #[test]
    fn test_existing_include_is_extended_without_duplicates() {
        let input = r#"{
  "compilerOptions": {
    "paths": {}
  },
  "include": ["src/**/*.ts", "**/*.ts"]
}
"#;
        let patched = patch(input).unwrap();

        assert_eq!(patched.matches("\"**/*.ts\"").count(), 1);
        assert!(patched.contains("\"src/**/*.ts\""));
        assert!(patched.contains("\"./restate.gen/**/*.ts\""));
        assert!(patched.contains("\"~restate\""));
    }

    #[test]
    fn test_missing_paths_block_is_created() {
        let input = "{\n  \"compilerOptions\": {\n    \"strict\": true\n  }\n}\n";
        let patched = patch(input).unwrap();

        assert!(patched.contains("\"paths\": {"));
        assert!(patched.contains("\"~restate/*\""));
        assert!(patched.contains("\"strict\": true"));
        assert!(patch(&patched).is_none());
    }

    #[test]
    fn test_update_tsconfig_writes_once() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tsconfig.json"), ENCORE_TSCONFIG).unwrap();

        let output_dir = Path::new("restate.gen");

        assert!(update_tsconfig(temp_dir.path(), output_dir).unwrap());
        assert!(!update_tsconfig(temp_dir.path(), output_dir).unwrap());
    }

    #[test]
    fn test_entries_follow_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("tsconfig.json"), ENCORE_TSCONFIG).unwrap();

        // Absolute and relative forms of the same directory patch alike
        assert!(update_tsconfig(root, &root.join("gen/restate")).unwrap());
        assert!(!update_tsconfig(root, Path::new("gen/restate")).unwrap());

        let patched = fs::read_to_string(root.join("tsconfig.json")).unwrap();
        assert!(patched.contains("\"~restate\": [\"./gen/restate/index.ts\"]"));
        assert!(patched.contains("\"~restate/*\": [\"./gen/restate/*\"]"));
        assert!(patched.contains("\"./gen/restate/**/*.ts\""));
        assert!(!patched.contains("restate.gen"));
    }

    #[test]
    fn test_missing_tsconfig_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            update_tsconfig(temp_dir.path(), Path::new("restate.gen")),
            Err(GenError::Io { .. })
        ));
    }
}
