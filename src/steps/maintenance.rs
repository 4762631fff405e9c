// src/steps/maintenance.rs

use super::InstallContext;
use crate::core::templates::{BACKUP, PURGE_TEMP_FILES, ZEO_PACK};
use crate::system::console;
use crate::system::ops;
use anyhow::Result;

/// A maintenance script run periodically from the crontab of the project's user.
struct CronScript {
    enabled_by: &'static str,
    frequency: &'static str,
    file_name: &'static str,
    template: &'static str,
    heading: &'static str,
}

const ZEO_PACK_SCRIPT: CronScript = CronScript {
    enabled_by: "zeo_pack",
    frequency: "zeo_pack_frequency",
    file_name: "zeopack.sh",
    template: ZEO_PACK,
    heading: "Configuring database packing",
};

const PURGE_SCRIPT: CronScript = CronScript {
    enabled_by: "purge_temp_files",
    frequency: "purge_temp_files_frequency",
    file_name: "purge-temp-files.sh",
    template: PURGE_TEMP_FILES,
    heading: "Configuring purging of temporary files",
};

const BACKUP_SCRIPT: CronScript = CronScript {
    enabled_by: "backup",
    frequency: "backup_frequency",
    file_name: "backup.sh",
    template: BACKUP,
    heading: "Configuring backups",
};

fn install_cron_script(ctx: &InstallContext, script: &CronScript) -> Result<()> {
    if !ctx.namespace.get_bool(script.enabled_by)? {
        return Ok(());
    }

    console::heading(script.heading);
    let path = ctx.path("project_dir")?.join("scripts").join(script.file_name);
    ctx.write_template(&path, script.template, Some(0o744))?;

    let cronjob = format!(
        "{} {}",
        ctx.namespace.get_str(script.frequency)?,
        path.display()
    );
    ops::install_cronjob(
        ctx.host(),
        &cronjob,
        ctx.namespace.get_opt_str("dedicated_user")?,
    )?;
    Ok(())
}

pub fn configure_zeo_pack(ctx: &mut InstallContext) -> Result<()> {
    install_cron_script(ctx, &ZEO_PACK_SCRIPT)
}

pub fn configure_temp_files_purging(ctx: &mut InstallContext) -> Result<()> {
    install_cron_script(ctx, &PURGE_SCRIPT)
}

pub fn configure_backup(ctx: &mut InstallContext) -> Result<()> {
    install_cron_script(ctx, &BACKUP_SCRIPT)
}
