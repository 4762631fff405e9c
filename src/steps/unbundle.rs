// src/steps/unbundle.rs

use super::InstallContext;
use crate::system::console;
use anyhow::{Context, Result};

pub fn extract_bundle_to_temp_dir(ctx: &mut InstallContext) -> Result<()> {
    let bundle = ctx
        .bundle
        .as_ref()
        .context("This executable carries no embedded project")?;
    let dest = ctx.path("source_installation")?;

    console::heading("Extracting bundle data");
    if ctx.host.exists(&dest) {
        log::warn!("Removing stale bundle data at '{}'.", dest.display());
        ctx.host.remove_dir_all(&dest)?;
    }
    ctx.host.create_dir_all(&dest)?;
    ctx.host.set_mode(&dest, 0o755)?;

    bundle
        .extract_to(&dest)
        .with_context(|| format!("Could not extract the bundle into '{}'", dest.display()))?;
    ctx.host.hand_over(&dest)?;
    Ok(())
}

pub fn delete_bundle_temp_dir(ctx: &mut InstallContext) -> Result<()> {
    let dest = ctx.path("source_installation")?;
    console::heading("Deleting temporary bundle data");
    ctx.host.remove_dir_all(&dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bundle::{assemble, create_archive, parse_embedded};
    use crate::core::namespace::{Overrides, Value};
    use crate::models::Compression;
    use crate::steps::testing::fixture_with;
    use crate::steps::InstallVariant;
    use crate::system::host::testing::RecordingHost;
    use std::fs;

    #[test]
    fn test_extract_and_delete() {
        let scratch = tempfile::tempdir().unwrap();
        let project = scratch.path().join("acme");
        fs::create_dir_all(project.join("acme").join("data")).unwrap();
        fs::write(project.join("acme").join("data").join("database.fs"), "db").unwrap();
        let archive = create_archive(&project, "acme", Compression::Lz4).unwrap();
        let bundle = assemble(b"program", &archive, Compression::Lz4, Overrides::new()).unwrap();

        let dest = scratch.path().join("bundle");
        fs::create_dir_all(dest.join("stale")).unwrap();
        let mut fx = fixture_with(
            RecordingHost::new(),
            InstallVariant::Unbundle,
            &[("source_installation", Value::from(dest.display().to_string()))],
        );
        fx.context.bundle = parse_embedded(&bundle).unwrap();

        extract_bundle_to_temp_dir(&mut fx.context).unwrap();
        assert!(!dest.join("stale").exists());
        assert_eq!(
            fs::read_to_string(dest.join("acme/acme/data/database.fs")).unwrap(),
            "db"
        );
        assert_eq!(fx.commands(), vec![format!("hand_over {}", dest.display())]);

        delete_bundle_temp_dir(&mut fx.context).unwrap();
        assert!(!dest.exists());
    }

    #[test]
    fn test_missing_bundle_is_an_error() {
        let mut fx = fixture_with(
            RecordingHost::new(),
            InstallVariant::Unbundle,
            &[("source_installation", Value::from("/tmp/nowhere"))],
        );
        assert!(extract_bundle_to_temp_dir(&mut fx.context).is_err());
    }
}
