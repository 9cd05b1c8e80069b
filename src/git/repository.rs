use crate::error::{PipelineError, Result};
use crate::git::VersionControl;
use git2::{Cred, CredentialType, ErrorClass, Index, PushOptions, RemoteCallbacks, Repository};
use std::path::{Path, PathBuf};

/// Wrapper around git2::Repository implementing [`VersionControl`]
pub struct Git2Repository {
    repo: Repository,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path)?;
        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Repository) -> Self {
        Git2Repository { repo }
    }

    fn relative_to_workdir(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| PipelineError::config("Cannot commit in a bare repository"))?;
        let workdir = workdir.canonicalize()?;
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            workdir.join(path)
        };
        let absolute = absolute.canonicalize()?;

        absolute
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                PipelineError::config(format!(
                    "{} is outside the repository at {}",
                    path.display(),
                    workdir.display()
                ))
            })
    }
}

/// Credentials for push: SSH agent first, then the usual key files, then
/// whatever libgit2 finds by default (credential helpers).
fn credentials_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");
        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
        }
        Cred::default()
    });

    callbacks.push_update_reference(|refname, status| match status {
        Some(status) => {
            tracing::warn!(reference = refname, %status, "remote rejected reference");
            Err(git2::Error::from_str(&format!(
                "Push rejected for {}: {}",
                refname, status
            )))
        }
        None => Ok(()),
    });
    callbacks
}

impl VersionControl for Git2Repository {
    fn commit(&mut self, paths: &[&Path], message: &str) -> Result<String> {
        let mut index = self.repo.index()?;
        let mut relative_paths = Vec::with_capacity(paths.len());
        for path in paths {
            let relative = self.relative_to_workdir(path)?;
            index.add_path(&relative)?;
            relative_paths.push(relative);
        }
        index.write()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        // HEAD's tree plus exactly the given paths; other staged changes stay staged.
        let mut release_index = Index::new()?;
        if let Some(parent) = &parent {
            release_index.read_tree(&parent.tree()?)?;
        }
        for relative in &relative_paths {
            let entry = index.get_path(relative, 0).ok_or_else(|| {
                PipelineError::config(format!("{} could not be staged", relative.display()))
            })?;
            release_index.add(&entry)?;
        }
        let tree_id = release_index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.repo.signature()?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        tracing::info!(commit = %oid, files = paths.len(), "created commit");
        Ok(oid.to_string())
    }

    fn tag(&mut self, name: &str, message: &str) -> Result<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        let signature = self.repo.signature()?;
        self.repo
            .tag(name, head.as_object(), &signature, message, false)?;
        tracing::info!(tag = name, commit = %head.id(), "created annotated tag");
        Ok(())
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(PipelineError::config(
                "HEAD is detached; check out the branch to release from",
            ));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::config("Current branch name is not valid UTF-8"))
    }

    fn push(&mut self, remote_name: &str, branch: &str, tag: &str) -> Result<()> {
        let mut remote = self.repo.find_remote(remote_name).map_err(|_| {
            PipelineError::config(format!("No remote named '{}' found", remote_name))
        })?;

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(credentials_callbacks());

        let refspecs = [
            format!("refs/heads/{0}:refs/heads/{0}", branch),
            format!("refs/tags/{0}:refs/tags/{0}", tag),
        ];
        let refspecs: Vec<&str> = refspecs.iter().map(String::as_str).collect();

        remote
            .push(&refspecs, Some(&mut push_options))
            .map_err(|e| match e.class() {
                ErrorClass::Net => PipelineError::Git(git2::Error::from_str(&format!(
                    "Network error during push to '{}': {}",
                    remote_name,
                    e.message()
                ))),
                _ => PipelineError::Git(e),
            })?;

        tracing::info!(remote = remote_name, branch, tag, "pushed branch and tag");
        Ok(())
    }
}
