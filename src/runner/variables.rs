use log::warn;
use std::path::Path;

pub const VARIABLE_CWD: &str = "${cwd}";
pub const VARIABLE_FILE: &str = "${file}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub args: Vec<String>,
    /// At least one argument referenced `${file}`.
    pub has_file_variable: bool,
}

/// Replaces `${cwd}` and `${file}` literally in every argument.
/// Single pass: text coming from a substituted path is never expanded again.
pub fn substitute(args: &[String], cwd: &Path, file: Option<&Path>) -> Substitution {
    let cwd_str = cwd.to_string_lossy();
    let file_str = file
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let has_file_variable = args.iter().any(|arg| arg.contains(VARIABLE_FILE));
    if has_file_variable && file.is_none() {
        warn!("No active file; {} expands to an empty string", VARIABLE_FILE);
    }

    let args = args
        .iter()
        .map(|arg| expand(arg, &cwd_str, &file_str))
        .collect();

    Substitution {
        args,
        has_file_variable,
    }
}

fn expand(arg: &str, cwd: &str, file: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(pos) = rest.find("${") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(VARIABLE_CWD) {
            out.push_str(cwd);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(VARIABLE_FILE) {
            out.push_str(file);
            rest = after;
        } else {
            out.push_str("${");
            rest = &tail[2..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cwd_substitution() {
        let out = substitute(&strings(&["run", "${cwd}/build"]), Path::new("/ws"), None);
        assert_eq!(out.args, strings(&["run", "/ws/build"]));
        assert!(!out.has_file_variable);
    }

    #[test]
    fn test_cwd_and_file_in_same_argument() {
        let out = substitute(
            &strings(&["--src=${cwd}:${file}"]),
            Path::new("/ws"),
            Some(Path::new("/ws/a.txt")),
        );
        assert_eq!(out.args, strings(&["--src=/ws:/ws/a.txt"]));
        assert!(out.has_file_variable);
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let out = substitute(&strings(&["${cwd}${cwd}"]), Path::new("/x"), None);
        assert_eq!(out.args, strings(&["/x/x"]));
    }

    #[test]
    fn test_missing_file_expands_empty_but_is_recorded() {
        let out = substitute(&strings(&["lint", "${file}"]), Path::new("/ws"), None);
        assert_eq!(out.args, strings(&["lint", ""]));
        assert!(out.has_file_variable);
    }

    #[test]
    fn test_no_recursive_expansion() {
        let out = substitute(&strings(&["${cwd}"]), Path::new("/ws/${file}"), Some(Path::new("f")));
        assert_eq!(out.args, strings(&["/ws/${file}"]));
        assert!(!out.has_file_variable);
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let out = substitute(&strings(&["${HOME}/${cwd"]), Path::new("/ws"), None);
        assert_eq!(out.args, strings(&["${HOME}/${cwd"]));
    }
}
