//! Python import and install-directive extraction from cell sources.
//!
//! Line-oriented: one statement per line, continuation lines are not
//! followed. Relative imports (`from . import x`) are skipped since they
//! never name an installable package.

/// A single import statement or install directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFact {
    /// 1-based line number in the cell source.
    pub line: usize,
    /// Statement kind.
    pub import_kind: ImportKind,
    /// Dotted module path, or package name for install directives.
    pub module: String,
    /// Names pulled in by `from x import a, b`.
    pub imported_names: Vec<String>,
}

impl ImportFact {
    /// First segment of the module path (`sklearn.model_selection` -> `sklearn`).
    pub fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }
}

/// Kind of import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import foo` / `import foo.bar as baz`
    Import,

    /// `from foo import bar`
    From,

    /// `!pip install foo` / `%pip install foo`
    PipInstall,
}

impl ImportKind {
    /// Convert to string for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Import => "Import",
            ImportKind::From => "From",
            ImportKind::PipInstall => "PipInstall",
        }
    }
}

/// Extract imports and install directives from Python source.
///
/// # Examples
///
/// ```
/// # use nbpack::ingest::imports::{extract_imports, ImportKind};
/// let facts = extract_imports("import os, numpy as np\n!pip install -q openai>=1.0\n");
/// assert_eq!(facts.len(), 3);
/// assert_eq!(facts[1].module, "numpy");
/// assert_eq!(facts[2].import_kind, ImportKind::PipInstall);
/// assert_eq!(facts[2].module, "openai");
/// ```
pub fn extract_imports(source: &str) -> Vec<ImportFact> {
    let mut facts = Vec::new();
    for (i, raw_line) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = strip_comment(raw_line).trim();

        if let Some(rest) = line.strip_prefix("import ") {
            for item in rest.split(',') {
                if let Some(module) = module_name(item) {
                    facts.push(ImportFact {
                        line: line_no,
                        import_kind: ImportKind::Import,
                        module,
                        imported_names: Vec::new(),
                    });
                }
            }
        } else if let Some(rest) = line.strip_prefix("from ") {
            let Some((module, names)) = rest.split_once(" import ") else {
                continue;
            };
            let Some(module) = module_name(module) else {
                continue;
            };
            let imported_names = names
                .trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
                .split(',')
                .filter_map(|n| n.split_whitespace().next())
                .map(str::to_string)
                .collect();
            facts.push(ImportFact {
                line: line_no,
                import_kind: ImportKind::From,
                module,
                imported_names,
            });
        } else if let Some(args) = pip_install_args(line) {
            facts.extend(parse_pip_args(args).into_iter().map(|module| ImportFact {
                line: line_no,
                import_kind: ImportKind::PipInstall,
                module,
                imported_names: Vec::new(),
            }));
        }
    }
    facts
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// `numpy.linalg as la` -> `numpy.linalg`; relative or malformed -> `None`.
fn module_name(item: &str) -> Option<String> {
    let name = item.split_whitespace().next()?;
    let valid = !name.starts_with('.')
        && name
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
    valid.then(|| name.to_string())
}

fn pip_install_args(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('!').or_else(|| line.strip_prefix('%'))?;
    let mut words = rest.splitn(3, char::is_whitespace);
    let tool = words.next()?;
    if !matches!(tool, "pip" | "pip3") {
        return None;
    }
    if words.next()? != "install" {
        return None;
    }
    Some(words.next().unwrap_or(""))
}

/// Package names from pip arguments, with flags and version specifiers dropped.
fn parse_pip_args(args: &str) -> Vec<String> {
    let mut packages = Vec::new();
    let mut skip_next = false;
    for token in args.split_whitespace() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if token.starts_with('-') {
            // Flags that take a file or index argument
            skip_next = matches!(
                token,
                "-r" | "--requirement" | "-c" | "--constraint" | "-e" | "--editable" | "-i" | "--index-url"
            );
            continue;
        }
        let token = token.trim_matches(|c| c == '"' || c == '\'');
        let name: String = token
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();
        if !name.is_empty() && !name.contains('/') {
            packages.push(name);
        }
    }
    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules(source: &str) -> Vec<String> {
        extract_imports(source).into_iter().map(|f| f.module).collect()
    }

    #[test]
    fn test_plain_imports() {
        assert_eq!(modules("import os\nimport numpy as np\n"), vec!["os", "numpy"]);
    }

    #[test]
    fn test_multiple_names_in_one_import() {
        assert_eq!(modules("import a, b as c, d.e"), vec!["a", "b", "d.e"]);
    }

    #[test]
    fn test_from_import() {
        let facts = extract_imports("from sklearn.model_selection import train_test_split, KFold");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].import_kind, ImportKind::From);
        assert_eq!(facts[0].top_level(), "sklearn");
        assert_eq!(facts[0].imported_names, vec!["train_test_split", "KFold"]);
    }

    #[test]
    fn test_relative_import_skipped() {
        assert!(modules("from . import utils\nfrom ..pkg import x").is_empty());
    }

    #[test]
    fn test_indented_import() {
        let facts = extract_imports("try:\n    import openai\nexcept ImportError:\n    pass\n");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].line, 2);
    }

    #[test]
    fn test_pip_install_variants() {
        let source = "!pip install -q openai>=1.0 'pandas==2.1' scikit-learn\n%pip install -r requirements.txt anthropic[vertex]\n";
        assert_eq!(
            modules(source),
            vec!["openai", "pandas", "scikit-learn", "anthropic"]
        );
    }

    #[test]
    fn test_kind_labels() {
        let kinds: Vec<&str> = extract_imports("import os\nfrom a import b\n!pip install c\n")
            .iter()
            .map(|f| f.import_kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["Import", "From", "PipInstall"]);
    }

    #[test]
    fn test_commented_import_ignored() {
        assert!(modules("# import secret_module\nx = 1  # import nothing").is_empty());
    }

    #[test]
    fn test_import_in_string_ignored() {
        assert!(modules("print('import os')").is_empty());
    }
}
