//! Where the CLI keeps state between invocations
//!
//! The short-lived scope lives under the system temp dir so a reboot clears it;
//! the durable scope lives in the state directory.

use anyhow::Context as _;
use riskcheck_client::ClientConfig;
use riskcheck_store::{FileScope, Scopes};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SESSION_FILE: &str = "session.json";
const DURABLE_FILE: &str = "state.json";

/// Short-lived scope file
pub(crate) fn session_path() -> PathBuf {
    std::env::temp_dir().join("riskcheck").join(SESSION_FILE)
}

/// Durable state directory: configured, else `$HOME/.local/share/riskcheck`
pub(crate) fn state_dir(config: &ClientConfig, home: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &config.state_dir {
        return Ok(dir.clone());
    }
    let home = home
        .filter(|h| !h.as_os_str().is_empty())
        .context("HOME is not set; set RISKCHECK_STATE_DIR instead")?;
    Ok(home.join(".local").join("share").join("riskcheck"))
}

pub(crate) fn open_scopes(config: &ClientConfig) -> anyhow::Result<Scopes> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let durable = state_dir(config, home.as_deref())?.join(DURABLE_FILE);
    let session = session_path();
    tracing::debug!("State files: session {}, durable {}", session.display(), durable.display());
    Ok(Scopes::new(
        Arc::new(FileScope::named(session, "session")),
        Arc::new(FileScope::new(durable)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_dir_wins() {
        let config = ClientConfig::new().with_state_dir("/srv/riskcheck");
        let dir = state_dir(&config, Some(Path::new("/home/ana"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/riskcheck"));
    }

    #[test]
    fn falls_back_to_home() {
        let dir = state_dir(&ClientConfig::new(), Some(Path::new("/home/ana"))).unwrap();
        assert_eq!(dir, PathBuf::from("/home/ana/.local/share/riskcheck"));
        assert!(state_dir(&ClientConfig::new(), None).is_err());
    }
}
