use crate::error::InstallError;
use std::fmt;
use std::str::FromStr;

/// A GitHub repository in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    /// Parse an identifier such as `cndrsdrmn/go-spreadsheet`.
    ///
    /// Accepts a trailing `.git` and a `https://github.com/` prefix, since both
    /// are commonly pasted from a browser or clone URL.
    pub fn parse(repo: &str) -> Result<Self, InstallError> {
        let invalid = || InstallError::InvalidRepository(repo.to_string());

        let trimmed = repo.trim();
        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(invalid());
        }

        let path = trimmed
            .strip_prefix("https://github.com/")
            .unwrap_or(trimmed)
            .trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);

        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(name) {
            return Err(invalid());
        }

        Ok(RepoId {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Latest-release endpoint under the given API base.
    pub fn latest_release_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            api_base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl FromStr for RepoId {
    type Err = InstallError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RepoId::parse(value)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
