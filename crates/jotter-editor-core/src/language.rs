//! Heuristic programming-language detection for code snippets.
//!
//! Each language has a keyword list. A language scores the summed weight of the
//! keywords found in the snippet (case-sensitive substring match), divided by
//! the size of its list. Keywords ending in a space are "strong" and weigh more.
//! Languages are checked in declaration order and the first whose score clears
//! the threshold wins; otherwise a few coarse lowercase fallbacks apply.

use smol_str::SmolStr;

use crate::config::ClassifierConfig;

/// A detectable language and its keyword list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageDef {
    pub name: &'static str,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

impl LanguageDef {
    fn is_strong(keyword: &str) -> bool {
        keyword.ends_with(' ')
    }
}

/// Detectable languages, in priority order.
pub static LANGUAGES: &[LanguageDef] = &[
    LanguageDef {
        name: "javascript",
        label: "JavaScript",
        keywords: &[
            "function ", "const ", "let ", "var ", "=>", "console.", "document.", "require(",
            "module.exports", "undefined", "===", "null",
        ],
    },
    LanguageDef {
        name: "typescript",
        label: "TypeScript",
        keywords: &[
            "interface ", "type ", "enum ", "implements ", "namespace ", "readonly ",
            ": string", ": number", ": boolean", "as ", "<T>", "private ",
        ],
    },
    LanguageDef {
        name: "python",
        label: "Python",
        keywords: &[
            "def ", "elif ", "lambda ", "print(", "self.", "None", "True", "False", "__init__",
            "import ", "from ", ":\n",
        ],
    },
    LanguageDef {
        name: "rust",
        label: "Rust",
        keywords: &[
            "fn ", "let mut ", "impl ", "pub ", "struct ", "match ", "use ", "mod ", "->",
            "&self", "::", "Vec<", "Option<", "println!",
        ],
    },
    LanguageDef {
        name: "go",
        label: "Go",
        keywords: &[
            "func ", "package ", "defer ", "go ", "chan ", ":=", "fmt.", "nil", "struct {",
            "interface {",
        ],
    },
    LanguageDef {
        name: "java",
        label: "Java",
        keywords: &[
            "public class ", "extends ", "throws ", "System.out", "void ", "static ", "new ",
            "@Override", "String[]", "final ",
        ],
    },
    LanguageDef {
        name: "cpp",
        label: "C++",
        keywords: &[
            "#include ", "template ", "std::", "cout", "nullptr", "virtual ",
            "using namespace ", "->", "::", "int main",
        ],
    },
    LanguageDef {
        name: "csharp",
        label: "C#",
        keywords: &[
            "using System", "Console.", "var ", "async Task", "get;", "set;", "namespace ",
            "public ", "override ", "=>", "string ",
        ],
    },
    LanguageDef {
        name: "bash",
        label: "Bash",
        keywords: &[
            "#!/bin/", "echo ", "fi", "then", "export ", "$(", "sudo ", "grep ", "done", "esac",
            "chmod ",
        ],
    },
    LanguageDef {
        name: "php",
        label: "PHP",
        keywords: &[
            "<?php", "echo ", "$this->", "function ", "->", "=>", "array(", "foreach ",
            "public function", "$_GET", "$_POST", "?>",
        ],
    },
    LanguageDef {
        name: "ruby",
        label: "Ruby",
        keywords: &[
            "def ", "end", "puts ", "elsif ", "attr_accessor ", "require ", "do |", "nil",
            "module ", "unless ",
        ],
    },
    LanguageDef {
        name: "sql",
        label: "SQL",
        keywords: &[
            "SELECT ", "FROM ", "WHERE ", "INSERT ", "UPDATE ", "DELETE ", "JOIN ", "GROUP BY",
            "ORDER BY", "CREATE TABLE",
        ],
    },
    LanguageDef {
        name: "html",
        label: "HTML",
        keywords: &[
            "<html", "<div", "</div>", "<span", "<p>", "<body", "<head", "class=", "<a ",
            "<img ", "<input ", "<!DOCTYPE",
        ],
    },
    LanguageDef {
        name: "css",
        label: "CSS",
        keywords: &[
            "{", "}", "color:", "margin:", "padding:", "display:", "font-size:", "@media ",
            "@import ", "px;", "background:",
        ],
    },
    LanguageDef {
        name: "yaml",
        label: "YAML",
        keywords: &["---", ": ", "- ", "version:", "name:"],
    },
    LanguageDef {
        name: "json",
        label: "JSON",
        keywords: &["{\"", "\":", "\",", "[{", "}]", "true", "false", "null"],
    },
];

/// Language choices for a code block's selector: plain text, then every detectable language.
pub fn language_options() -> impl Iterator<Item = (&'static str, &'static str)> {
    std::iter::once(("plaintext", "Plain text")).chain(LANGUAGES.iter().map(|l| (l.name, l.label)))
}

/// Whether `name` is one of the selectable languages.
pub fn is_supported(name: &str) -> bool {
    language_options().any(|(id, _)| id == name)
}

/// Keyword-scoring language classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Normalized score of `code` against one language.
    pub fn score(&self, language: &LanguageDef, code: &str) -> f64 {
        if language.keywords.is_empty() {
            return 0.0;
        }
        let total: f64 = language
            .keywords
            .iter()
            .filter(|kw| code.contains(**kw))
            .map(|kw| {
                if LanguageDef::is_strong(kw) {
                    self.config.strong_weight
                } else {
                    1.0
                }
            })
            .sum();
        total / language.keywords.len() as f64
    }

    /// Best-guess language for a snippet. Never fails.
    pub fn classify(&self, code: &str) -> SmolStr {
        if code.trim().is_empty() {
            return SmolStr::new(&self.config.default_language);
        }

        for language in LANGUAGES {
            let score = self.score(language, code);
            if score > self.config.threshold {
                tracing::trace!(
                    target: "jotter::language",
                    language = language.name,
                    score,
                    "classified snippet"
                );
                return SmolStr::new_static(language.name);
            }
        }

        let lower = code.to_lowercase();
        let guess = if lower.contains("function") || lower.contains("console.") {
            "javascript"
        } else if lower.contains("def ") || lower.contains("print(") {
            "python"
        } else if lower.contains('<') && lower.contains('>') {
            "html"
        } else if lower.contains("select ") || lower.contains("from ") || lower.contains("where ")
        {
            "sql"
        } else {
            return SmolStr::new(&self.config.default_language);
        };
        tracing::trace!(target: "jotter::language", language = guess, "classified by fallback");
        SmolStr::new_static(guess)
    }
}

/// Classify with the default tuning.
pub fn classify(code: &str) -> SmolStr {
    Classifier::default().classify(code)
}
