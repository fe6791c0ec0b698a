//! Browse URLs for submodules.
//!
//! A submodule's `.gitmodules` url is usually a clone url. When it points
//! at a known hosting site, the tree view links to that site's page for the
//! pinned commit instead.

/// A prefix under which a host serves repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountPoint {
    Http { host: String, protocol: String },
    Git { host: String },
    Ssh { user: String, host: String },
}

impl MountPoint {
    pub fn http(host: &str, protocol: &str) -> Self {
        Self::Http {
            host: host.to_string(),
            protocol: protocol.to_string(),
        }
    }

    pub fn git(host: &str) -> Self {
        Self::Git {
            host: host.to_string(),
        }
    }

    pub fn ssh(user: &str, host: &str) -> Self {
        Self::Ssh {
            user: user.to_string(),
            host: host.to_string(),
        }
    }

    pub fn base_url(&self) -> String {
        match self {
            Self::Http { host, protocol } => format!("{}://{}/", protocol, host),
            Self::Git { host } => format!("git://{}/", host),
            Self::Ssh { user, host } => format!("{}@{}:", user, host),
        }
    }
}

/// One hosting site: where it serves clones from, and how to build a
/// browse URL. The template's `{project}`, `{repository}` and `{commit}`
/// placeholders are filled in.
#[derive(Debug, Clone)]
pub struct HostParser {
    mount_points: Vec<MountPoint>,
    template: String,
}

impl HostParser {
    pub fn new(mount_points: Vec<MountPoint>, template: impl Into<String>) -> Self {
        Self {
            mount_points,
            template: template.into(),
        }
    }

    pub fn gitorious() -> Self {
        Self::new(
            vec![
                MountPoint::git("gitorious.org"),
                MountPoint::http("git.gitorious.org", "http"),
                MountPoint::http("git.gitorious.org", "https"),
                MountPoint::ssh("git", "gitorious.org"),
            ],
            "https://gitorious.org/{project}/{repository}/source/{commit}",
        )
    }

    pub fn github() -> Self {
        Self::new(
            vec![
                MountPoint::git("github.com"),
                MountPoint::http("github.com", "https"),
                MountPoint::ssh("git", "github.com"),
            ],
            "https://github.com/{project}/{repository}/tree/{commit}",
        )
    }

    pub fn bitbucket() -> Self {
        Self::new(
            vec![
                MountPoint::http("bitbucket.org", "https"),
                MountPoint::ssh("git", "bitbucket.org"),
            ],
            "https://bitbucket.org/{project}/{repository}/src/{commit}",
        )
    }

    pub fn browse_url(&self, url: &str, commit: &str) -> Option<String> {
        self.mount_points.iter().find_map(|mount_point| {
            let (project, repository) = split_repository(url, &mount_point.base_url())?;
            Some(
                self.template
                    .replace("{project}", project)
                    .replace("{repository}", repository)
                    .replace("{commit}", commit),
            )
        })
    }
}

/// Last two path segments of `url` after `base`, without `.git`.
fn split_repository<'a>(url: &'a str, base: &str) -> Option<(&'a str, &'a str)> {
    let start = url.find(base)? + base.len();
    let rest = &url[start..];
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut segments = rest.rsplit('/');
    let repository = segments.next().filter(|s| !s.is_empty())?;
    let project = segments.next().filter(|s| !s.is_empty())?;
    Some((project, repository))
}

#[derive(Debug, Clone)]
pub struct SubmoduleUrlResolver {
    parsers: Vec<HostParser>,
}

impl SubmoduleUrlResolver {
    pub fn new(parsers: Vec<HostParser>) -> Self {
        Self { parsers }
    }

    /// The first parser that recognises `url` wins; otherwise the url
    /// itself is the best link there is.
    pub fn browse_url(&self, url: &str, commit: &str) -> String {
        self.parsers
            .iter()
            .find_map(|p| p.browse_url(url, commit))
            .unwrap_or_else(|| url.to_string())
    }
}

impl Default for SubmoduleUrlResolver {
    fn default() -> Self {
        Self::new(vec![
            HostParser::gitorious(),
            HostParser::github(),
            HostParser::bitbucket(),
        ])
    }
}
