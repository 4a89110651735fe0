//! Replication endpoint parsing.
//!
//! An endpoint operand has the form `[user@host:]dataset`. The presence of
//! `@` selects the remote form; everything else is a local dataset path.
//! Reconstructing a parsed endpoint with [`fmt::Display`] yields the exact
//! operand it was parsed from.

use std::fmt;

use thiserror::Error;

/// Errors produced while parsing an endpoint operand.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EndpointParseError {
    /// The operand contained `user@host` but no `:` separating the dataset.
    #[error("endpoint {0:?} has a remote user but no dataset separator")]
    MissingSeparator(String),
    /// The dataset portion of the operand was empty.
    #[error("endpoint {0:?} has an empty dataset")]
    EmptyDataset(String),
    /// The user or host portion of a remote operand was empty.
    #[error("endpoint {0:?} has an empty user or host")]
    EmptyRemote(String),
}

/// The `user@host` pair of a remote endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RemoteUser {
    user: String,
    host: String,
}

impl RemoteUser {
    /// Returns the remote login user.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the remote host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the `user@host` operand handed to `ssh`.
    #[must_use]
    pub fn ssh_target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Reports whether the remote login user is the superuser.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.user == "root"
    }
}

/// A resolved replication endpoint: an optional remote location plus the
/// dataset path on that location.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint {
    remote: Option<RemoteUser>,
    dataset: String,
}

impl Endpoint {
    /// Parses an endpoint operand.
    ///
    /// Operands containing `@` are remote and must carry a `:` separating
    /// the host from the dataset. Operands without `@` are local dataset
    /// paths taken verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError`] when a remote operand lacks the `:`
    /// separator, when the user or host portion is empty, or when the
    /// dataset portion is empty in either form.
    pub fn parse(raw: &str) -> Result<Self, EndpointParseError> {
        if let Some(at) = raw.find('@') {
            let user = &raw[..at];
            let rest = &raw[at + 1..];
            let Some(colon) = rest.find(':') else {
                return Err(EndpointParseError::MissingSeparator(raw.to_string()));
            };
            let host = &rest[..colon];
            let dataset = &rest[colon + 1..];
            if user.is_empty() || host.is_empty() {
                return Err(EndpointParseError::EmptyRemote(raw.to_string()));
            }
            if dataset.is_empty() {
                return Err(EndpointParseError::EmptyDataset(raw.to_string()));
            }
            Ok(Self {
                remote: Some(RemoteUser {
                    user: user.to_string(),
                    host: host.to_string(),
                }),
                dataset: dataset.to_string(),
            })
        } else if raw.is_empty() {
            Err(EndpointParseError::EmptyDataset(raw.to_string()))
        } else {
            Ok(Self {
                remote: None,
                dataset: raw.to_string(),
            })
        }
    }

    /// Returns the remote location, or `None` for a local endpoint.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteUser> {
        self.remote.as_ref()
    }

    /// Returns the dataset path on this endpoint.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Returns an endpoint addressing a different dataset on the same
    /// location.
    #[must_use]
    pub fn with_dataset(&self, dataset: impl Into<String>) -> Self {
        Self {
            remote: self.remote.clone(),
            dataset: dataset.into(),
        }
    }

    /// Reports whether this endpoint is the local machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.remote.is_none()
    }

    /// Reports whether commands on this endpoint already run as root.
    ///
    /// Local endpoints consult the process's effective uid; remote endpoints
    /// check whether the login user is literally `root`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        match &self.remote {
            Some(remote) => remote.is_root(),
            None => process_is_root(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote {
            Some(remote) => write!(f, "{}@{}:{}", remote.user, remote.host, self.dataset),
            None => f.write_str(&self.dataset),
        }
    }
}

/// Reports whether the current process runs with an effective uid of 0.
#[must_use]
pub fn process_is_root() -> bool {
    rustix::process::geteuid().as_raw() == 0
}
