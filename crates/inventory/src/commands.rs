//! Device-side command templates and output checks.

use serde::{Deserialize, Serialize};

/// Package manager commands issued to the device.
///
/// Templates use `{id}`, `{path}`, `{user}` and `{extractor}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageCommands {
    pub list: String,
    /// Remote path of the label extractor binary.
    pub extractor: String,
    pub extract_label: String,
    pub uninstall: String,
    pub dump: String,
    pub reinstall: String,
    pub user: u32,
    pub success_marker: String,
}

impl Default for PackageCommands {
    fn default() -> Self {
        Self {
            list: "pm list packages -f".to_string(),
            extractor: "/data/local/tmp/extractor".to_string(),
            extract_label: "{extractor} {path}".to_string(),
            uninstall: "pm uninstall -k --user {user} {id}".to_string(),
            dump: "pm dump {id}".to_string(),
            reinstall: "pm install -r --user {user} {path}".to_string(),
            user: 0,
            success_marker: "Success".to_string(),
        }
    }
}

impl PackageCommands {
    pub fn list_packages(&self) -> String {
        self.list.clone()
    }

    pub fn extract_label(&self, path: &str) -> String {
        self.render(&self.extract_label, "", path)
    }

    pub fn uninstall(&self, id: &str) -> String {
        self.render(&self.uninstall, id, "")
    }

    pub fn dump(&self, id: &str) -> String {
        self.render(&self.dump, id, "")
    }

    pub fn reinstall(&self, path: &str) -> String {
        self.render(&self.reinstall, "", path)
    }

    pub fn is_success(&self, output: &str) -> bool {
        contains_word(output, &self.success_marker)
    }

    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("list", &self.list, None),
            ("extract_label", &self.extract_label, Some("{path}")),
            ("uninstall", &self.uninstall, Some("{id}")),
            ("dump", &self.dump, Some("{id}")),
            ("reinstall", &self.reinstall, Some("{path}")),
        ];
        for (name, template, placeholder) in required {
            if template.trim().is_empty() {
                return Err(format!("commands.{} is empty", name));
            }
            if let Some(placeholder) = placeholder {
                if !template.contains(placeholder) {
                    return Err(format!("commands.{} must contain {}", name, placeholder));
                }
            }
        }
        if self.extract_label.contains("{extractor}") && self.extractor.trim().is_empty() {
            return Err("commands.extractor is empty".to_string());
        }
        if self.success_marker.trim().is_empty() {
            return Err("commands.success_marker is empty".to_string());
        }
        Ok(())
    }

    fn render(&self, template: &str, id: &str, path: &str) -> String {
        template
            .replace("{extractor}", &self.extractor)
            .replace("{user}", &self.user.to_string())
            .replace("{id}", id)
            .replace("{path}", path)
    }
}

/// True if `word` occurs in `text` with no word character on either side.
///
/// Stricter than a substring check: `Unsuccessful` or `Success_` do not match.
pub fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';

    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Pulls the installer path out of `pm dump` output.
///
/// The path runs from just after `path: ` through the first `.apk` on the
/// same line; marker lines without `.apk` are skipped.
pub fn extract_installer_path(dump: &str) -> Option<String> {
    const MARKER: &str = "path: ";
    const EXTENSION: &str = ".apk";

    dump.lines().find_map(|line| {
        let (_, after) = line.split_once(MARKER)?;
        let end = after.find(EXTENSION)? + EXTENSION.len();
        let path = after[..end].trim();
        if path.len() > EXTENSION.len() {
            Some(path.to_string())
        } else {
            None
        }
    })
}
