/*!
 * User Database
 * Home directory lookup by login name
 */

use crate::core::errors::{PrimitiveError, PrimitiveResult};
use nix::unistd::User;
use std::path::PathBuf;
use tracing::debug;

/// Home directory of the user named `name`
pub fn user_home(name: &str) -> PrimitiveResult<PathBuf> {
    let user = User::from_name(name)
        .map_err(|errno| PrimitiveError::os("getpwnam_r", errno))?
        .ok_or_else(|| PrimitiveError::Argument(format!("user {} does not exist", name)))?;

    debug!(user = name, home = %user.dir.display(), "Resolved user home");
    Ok(user.dir)
}
