// src/steps/identity.rs

use super::InstallContext;
use crate::core::templates::DEDICATED_USER_BASH_ALIASES;
use crate::system::console;
use crate::system::executor::CommandLine;
use anyhow::{bail, Context, Result};

/// Switches every later command and file write to the project's dedicated user,
/// creating the account first if needed.
pub fn become_dedicated_user(ctx: &mut InstallContext) -> Result<()> {
    let Some(user) = ctx.namespace.get_opt_str("dedicated_user")?.map(str::to_string) else {
        return Ok(());
    };

    if !ctx.host.is_root() {
        bail!("Configuring a dedicated user for the project requires root access");
    }

    console::heading("Setting up the dedicated user");

    let (identity, is_new) = match ctx.host.lookup_user(&user)? {
        Some(identity) => (identity, false),
        None => {
            let useradd = ctx.namespace.get_str("useradd_script")?;
            let shell = ctx.namespace.get_str("dedicated_user_shell")?;
            ctx.host.run_elevated(
                &CommandLine::new(useradd).args(["-m", "-U", "-s", shell, user.as_str()]),
            )?;
            let identity = ctx
                .host
                .lookup_user(&user)?
                .with_context(|| format!("User '{}' is missing after being created", user))?;
            (identity, true)
        }
    };

    let home = identity.home.clone();
    log::debug!("Running as '{}' (uid {}).", identity.name, identity.uid);
    ctx.host.set_identity(Some(identity));

    if is_new {
        ctx.write_template(&home.join(".bash_aliases"), DEDICATED_USER_BASH_ALIASES, None)?;
    }
    Ok(())
}

pub fn restore_original_user(ctx: &mut InstallContext) -> Result<()> {
    if ctx.host.identity().is_some() {
        log::debug!("Restoring the original user.");
        ctx.host.set_identity(None);
    }
    Ok(())
}
