use std::path::Path;

/// A source language the analyzer knows how to label in prompts.
pub struct LanguageConfig {
    /// Also used as the tag of the fenced code block sent to the model.
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

const LANGUAGES: &[LanguageConfig] = &[
    LanguageConfig {
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageConfig {
        name: "typescript",
        extensions: &["ts", "tsx", "mts", "cts"],
    },
    LanguageConfig {
        name: "python",
        extensions: &["py"],
    },
    LanguageConfig {
        name: "rust",
        extensions: &["rs"],
    },
    LanguageConfig {
        name: "go",
        extensions: &["go"],
    },
    LanguageConfig {
        name: "java",
        extensions: &["java"],
    },
    LanguageConfig {
        name: "kotlin",
        extensions: &["kt", "kts"],
    },
    LanguageConfig {
        name: "c",
        extensions: &["c", "h"],
    },
    LanguageConfig {
        name: "cpp",
        extensions: &["cc", "cpp", "cxx", "hpp", "hh"],
    },
    LanguageConfig {
        name: "csharp",
        extensions: &["cs"],
    },
    LanguageConfig {
        name: "php",
        extensions: &["php"],
    },
    LanguageConfig {
        name: "ruby",
        extensions: &["rb"],
    },
    LanguageConfig {
        name: "swift",
        extensions: &["swift"],
    },
    LanguageConfig {
        name: "vue",
        extensions: &["vue"],
    },
    LanguageConfig {
        name: "svelte",
        extensions: &["svelte"],
    },
];

impl LanguageConfig {
    pub fn get_by_extension(ext: &str) -> Option<&'static LanguageConfig> {
        let ext = ext.to_ascii_lowercase();
        LANGUAGES.iter().find(|c| c.extensions.contains(&ext.as_str()))
    }

    pub fn get_by_path(path: &Path) -> Option<&'static LanguageConfig> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::get_by_extension)
    }
}

/// Whether a file looks like analyzable source code.
pub fn is_supported_source(path: &Path) -> bool {
    LanguageConfig::get_by_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_extension() {
        assert_eq!(LanguageConfig::get_by_extension("tsx").unwrap().name, "typescript");
        assert_eq!(LanguageConfig::get_by_extension("RS").unwrap().name, "rust");
        assert!(LanguageConfig::get_by_extension("md").is_none());
    }

    #[test]
    fn test_is_supported_source() {
        assert!(is_supported_source(Path::new("src/controllers/auth.js")));
        assert!(!is_supported_source(Path::new("README.md")));
        assert!(!is_supported_source(Path::new("Makefile")));
    }
}
