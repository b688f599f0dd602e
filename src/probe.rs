//! Environment probe: source revision, project root and invoking command
//!
//! Every probe tolerates failure. A missing `git`, a directory outside any
//! repository or garbled output all yield `None`; the run proceeds without
//! that piece of provenance.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run `git <args>` in `dir` and return trimmed stdout on success.
fn git_output(dir: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(dir).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "git unavailable");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(?args, status = ?output.status, "git probe failed");
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Current source-control revision (`git rev-parse HEAD`) seen from `dir`.
#[must_use]
pub fn revision(dir: &Path) -> Option<String> {
    git_output(dir, &["rev-parse", "HEAD"])
}

/// Top-level directory of the repository containing `dir`.
#[must_use]
pub fn project_root(dir: &Path) -> Option<PathBuf> {
    git_output(dir, &["rev-parse", "--show-toplevel"]).map(PathBuf::from)
}

/// Rewrite one argument relative to `root` when it is an absolute path below it.
fn relativize(arg: &str, root: &Path) -> String {
    let path = Path::new(arg);
    if !path.is_absolute() {
        return arg.to_string();
    }
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => arg.to_string(),
    }
}

/// Join `args` into one command line, making paths under `root` relative.
///
/// # Example
///
/// ```rust
/// use runlog::probe::normalized_command;
/// use std::path::Path;
///
/// let args = ["/home/me/proj/train.py", "--out", "/tmp/x"];
/// let cmd = normalized_command(args, Some(Path::new("/home/me/proj")));
/// assert_eq!(cmd, "train.py --out /tmp/x");
/// ```
pub fn normalized_command<I, S>(args: I, root: Option<&Path>) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|arg| match root {
            Some(root) => relativize(arg.as_ref(), root),
            None => arg.as_ref().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Provenance captured once when a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Repository top-level directory, if any
    pub project_root: Option<PathBuf>,
    /// Source revision, if any
    pub revision: Option<String>,
    /// Normalized invoking command line
    pub command: String,
}

impl Provenance {
    /// Probe `dir` and normalize `args` against the project root found there.
    pub fn capture<I, S>(dir: &Path, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let project_root = project_root(dir);
        let revision = revision(dir);
        let command = normalized_command(args, project_root.as_deref());
        Self {
            project_root,
            revision,
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_outside_root_pass_through() {
        let root = Path::new("/work/proj");
        let cmd = normalized_command(["python", "/work/project2/a.py", "/etc/x"], Some(root));
        assert_eq!(cmd, "python /work/project2/a.py /etc/x");
    }

    #[test]
    fn test_nested_paths_become_relative() {
        let root = Path::new("/work/proj");
        let cmd = normalized_command(
            ["/work/proj/scripts/train.py", "--data", "/work/proj/data/x.bin"],
            Some(root),
        );
        assert_eq!(cmd, "scripts/train.py --data data/x.bin");
    }

    #[test]
    fn test_root_itself_becomes_dot() {
        let cmd = normalized_command(["ls", "/work/proj"], Some(Path::new("/work/proj")));
        assert_eq!(cmd, "ls .");
    }

    #[test]
    fn test_no_root_leaves_command_unchanged() {
        let cmd = normalized_command(["/abs/train.py", "rel/path", "--lr=0.1"], None);
        assert_eq!(cmd, "/abs/train.py rel/path --lr=0.1");
    }

    #[test]
    fn test_probe_outside_repository_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        // A fresh temp dir may still sit inside a checkout on some machines;
        // only assert consistency between the two probes.
        let root = project_root(dir.path());
        let rev = revision(dir.path());
        if root.is_none() {
            assert!(rev.is_none());
        }
    }

    #[test]
    fn test_probe_missing_directory_is_absent() {
        let missing = Path::new("/definitely/not/a/real/dir/for/runlog");
        assert!(revision(missing).is_none());
        assert!(project_root(missing).is_none());
    }
}
