// src/steps/launcher.rs

//! # Desktop Launcher
//!
//! A `.desktop` entry that opens a dedicated gnome-terminal window with one tab per
//! project activity (database, web server, shell...). The window uses its own
//! terminal profile, cloned from the user's default one and named after the site.

use super::InstallContext;
use crate::core::features;
use crate::core::templates::{self, DESKTOP_FILE, LAUNCHER, LAUNCHER_TAB};
use crate::models::LauncherMode;
use crate::system::console;
use crate::system::executor::CommandLine;
use crate::system::host::Host;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const GSETTINGS: &str = "/usr/bin/gsettings";
const PROFILES_LIST: &str = "org.gnome.Terminal.ProfilesList";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn profile_path(uuid: &str) -> String {
    format!(
        "org.gnome.Terminal.Legacy.Profile:/org/gnome/terminal/legacy/profiles:/:{}/",
        uuid
    )
}

fn gsettings_get(host: &dyn Host, schema: &str, key: &str) -> Result<String> {
    let output = host.capture(&CommandLine::new(GSETTINGS).args(["get", schema, key]))?;
    Ok(output.trim().to_string())
}

fn gsettings_set(host: &dyn Host, schema: &str, key: &str, value: &str) -> Result<()> {
    host.run(&CommandLine::new(GSETTINGS).args(["set", schema, key, value]))?;
    Ok(())
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('\'')
}

/// Parses a GVariant string array as printed by `gsettings get`.
pub fn parse_profile_list(output: &str) -> Vec<String> {
    let output = output.trim();
    let output = output.strip_prefix("@as").unwrap_or(output).trim();
    output
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(unquote)
        .filter(|uuid| !uuid.is_empty())
        .map(str::to_string)
        .collect()
}

/// Profile keys that differ from the default profile, as GVariant literals.
fn custom_profile_settings(ctx: &InstallContext) -> Result<Vec<(&'static str, String)>> {
    let alias = ctx.namespace.get_str("alias")?;
    let command = format!(
        "/bin/bash --init-file {}",
        ctx.namespace.get_str("launcher_tab_script")?
    );
    let settings = [
        ("visible-name", serde_json::json!(alias)),
        ("title", serde_json::json!(alias)),
        ("title-mode", serde_json::json!("ignore")),
        ("use-custom-command", serde_json::json!(true)),
        ("custom-command", serde_json::json!(command)),
    ];
    settings
        .into_iter()
        .map(|(key, value)| -> Result<(&'static str, String)> {
            Ok((key, serde_json::to_string(&value)?))
        })
        .collect()
}

/// Finds the terminal profile named after the site, creating it if needed, and
/// copies the default profile's settings into it. Returns the profile's uuid.
fn configure_terminal_profile(ctx: &InstallContext) -> Result<String> {
    let host = ctx.host();
    let alias = ctx.namespace.get_str("alias")?;

    let mut profiles = parse_profile_list(&gsettings_get(host, PROFILES_LIST, "list")?);
    let mut existing = None;
    for uuid in &profiles {
        let name = gsettings_get(host, &profile_path(uuid), "visible-name")?;
        if unquote(&name) == alias {
            existing = Some(uuid.clone());
            break;
        }
    }

    let uuid = match existing {
        Some(uuid) => uuid,
        None => {
            let uuid = Uuid::new_v4().to_string();
            profiles.push(uuid.clone());
            let list: Vec<String> = profiles.iter().map(|u| format!("'{}'", u)).collect();
            gsettings_set(host, PROFILES_LIST, "list", &format!("[{}]", list.join(", ")))?;
            uuid
        }
    };

    let default = gsettings_get(host, PROFILES_LIST, "default")?;
    let source = profile_path(unquote(&default));
    let keys = host.capture(&CommandLine::new(GSETTINGS).args(["list-keys", source.as_str()]))?;
    let custom = custom_profile_settings(ctx)?;
    let target = profile_path(&uuid);

    for key in keys.split_whitespace() {
        let value = match custom.iter().find(|(custom_key, _)| *custom_key == key) {
            Some((_, value)) => value.clone(),
            None => gsettings_get(host, &source, key)?,
        };
        gsettings_set(host, &target, key, &value)?;
    }
    Ok(uuid)
}

/// Width and height of a PNG image, read from its header.
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if !data.starts_with(PNG_SIGNATURE) || data.get(12..16) != Some(b"IHDR".as_slice()) {
        return None;
    }
    let width = u32::from_be_bytes(data.get(16..20)?.try_into().ok()?);
    let height = u32::from_be_bytes(data.get(20..24)?.try_into().ok()?);
    Some((width, height))
}

/// `~/.local/share` of the user the launcher is installed for.
fn share_dir(desktop_file: &Path) -> Option<PathBuf> {
    desktop_file.parent()?.parent().map(Path::to_path_buf)
}

fn install_icons(ctx: &InstallContext) -> Result<()> {
    let alias = ctx.namespace.get_str("alias")?;
    let desktop_file = ctx.path("desktop_file")?;
    let theme_dir = share_dir(&desktop_file)
        .with_context(|| format!("Unexpected desktop file location '{}'", desktop_file.display()))?
        .join("icons")
        .join("hicolor");

    for icon in ctx.namespace.get_list("launcher_icons")? {
        let data = fs::read(&icon).with_context(|| format!("Could not read icon '{}'", icon))?;
        let (width, height) =
            png_dimensions(&data).with_context(|| format!("'{}' is not a PNG image", icon))?;
        let dest = theme_dir
            .join(format!("{}x{}", width, height))
            .join("apps")
            .join(format!("{}.png", alias));
        ctx.host.write_file(&dest, &data)?;
    }
    Ok(())
}

pub fn create_launcher(ctx: &mut InstallContext) -> Result<()> {
    let mode: LauncherMode = ctx.namespace.get_enum("launcher")?;
    if mode == LauncherMode::No {
        return Ok(());
    }

    if !features::find_feature("launcher")?.is_supported(ctx.host()) {
        if mode == LauncherMode::Auto {
            return Ok(());
        }
        bail!("Can't install the desktop launcher without an X server");
    }

    if ctx.namespace.get_opt_str("dedicated_user")?.is_some() {
        if mode == LauncherMode::Auto {
            return Ok(());
        }
        bail!("Can't install a desktop launcher for a dedicated user");
    }

    console::heading("Creating the project's desktop launcher");
    let profile = configure_terminal_profile(ctx)?;
    log::debug!("Using terminal profile {}.", profile);

    let launcher_dir = ctx.path("launcher_dir")?;
    ctx.host.create_dir_all(&launcher_dir)?;
    ctx.write_template(&ctx.path("launcher_script")?, LAUNCHER, Some(0o774))?;
    ctx.write_template(&ctx.path("launcher_tab_script")?, LAUNCHER_TAB, Some(0o774))?;
    for tab in templates::launcher_tabs(&ctx.namespace)? {
        let path = launcher_dir.join(format!("tab-{}", tab.key));
        ctx.write_template(&path, tab.script.text, Some(0o774))?;
    }

    let desktop_file = ctx.path("desktop_file")?;
    if let Some(dir) = desktop_file.parent() {
        ctx.host.create_dir_all(dir)?;
    }
    ctx.write_template(&desktop_file, DESKTOP_FILE, Some(0o774))?;

    install_icons(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;
    use crate::steps::testing::{fixture_with, Fixture};
    use crate::steps::InstallVariant;
    use crate::system::host::testing::RecordingHost;

    fn get(schema: &str, key: &str) -> String {
        format!("{} get {} {}", GSETTINGS, schema, key)
    }

    fn desktop_host(profile_name: &str) -> RecordingHost {
        let mut host = RecordingHost::new()
            .with_output(&get(PROFILES_LIST, "list"), "['b1c2']\n")
            .with_output(&get(&profile_path("b1c2"), "visible-name"), profile_name)
            .with_output(&get(PROFILES_LIST, "default"), "'b1c2'\n")
            .with_output(
                &format!("{} list-keys {}", GSETTINGS, profile_path("b1c2")),
                "visible-name\nfont\n",
            )
            .with_output(&get(&profile_path("b1c2"), "font"), "'Monospace 12'\n");
        host.present.insert(PathBuf::from("/usr/bin/X"));
        host
    }

    fn launcher_fixture(host: RecordingHost, settings: &[(&str, Value)]) -> Fixture {
        let mut fx = fixture_with(host, InstallVariant::Make, settings);
        let desktop = fx
            .dir
            .path()
            .join("home/.local/share/applications/acme.desktop");
        fx.context.namespace.set("desktop_file", desktop.display().to_string());
        fx
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(13_u32.to_be_bytes());
        data.extend(b"IHDR");
        data.extend(width.to_be_bytes());
        data.extend(height.to_be_bytes());
        data.extend([8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn test_parse_profile_list() {
        assert_eq!(
            parse_profile_list("['a-1', 'b-2']\n"),
            vec!["a-1".to_string(), "b-2".to_string()]
        );
        assert!(parse_profile_list("@as []").is_empty());
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(png_dimensions(&png(48, 32)), Some((48, 32)));
        assert_eq!(png_dimensions(b"GIF89a"), None);
        assert_eq!(png_dimensions(&png(48, 32)[..20]), None);
    }

    #[test]
    fn test_launcher_disabled() {
        let mut fx = launcher_fixture(desktop_host("'Default'"), &[("launcher", Value::from("no"))]);
        create_launcher(&mut fx.context).unwrap();
        assert!(fx.commands().is_empty());
    }

    #[test]
    fn test_dedicated_user_gets_no_launcher() {
        let mut fx = launcher_fixture(desktop_host("'Default'"), &[]);
        fx.context.namespace.set("dedicated_user", "acme");
        create_launcher(&mut fx.context).unwrap();
        assert!(fx.commands().is_empty());

        fx.context.namespace.set("launcher", "yes");
        let err = create_launcher(&mut fx.context).unwrap_err();
        assert!(err.to_string().contains("dedicated user"));
    }

    #[test]
    fn test_new_profile_and_launcher_files() {
        let mut fx = launcher_fixture(desktop_host("'Default'"), &[]);
        let icon = fx.dir.path().join("icon.png");
        fs::write(&icon, png(64, 64)).unwrap();
        fx.context
            .namespace
            .set("launcher_icons", vec![icon.display().to_string()]);

        create_launcher(&mut fx.context).unwrap();

        let commands = fx.commands();
        let list_update = format!("{} set {} list ", GSETTINGS, PROFILES_LIST);
        assert!(commands.iter().any(|c| c.starts_with(&list_update)));
        let sets: Vec<&String> = commands
            .iter()
            .filter(|c| c.contains(" set org.gnome.Terminal.Legacy.Profile"))
            .collect();
        assert_eq!(sets.len(), 2);
        assert!(sets[0].contains("visible-name"));
        assert!(sets[0].contains("Acme"));
        assert!(sets[1].contains("Monospace 12"));

        let launcher_dir = fx.path("launcher_dir");
        let launch = fs::read_to_string(launcher_dir.join("launch")).unwrap();
        assert!(launch.contains("--app-id info.woost.Acme"));
        assert!(launcher_dir.join("tab").exists());
        assert!(launcher_dir.join("tab-zeo").exists());
        assert!(launcher_dir.join("tab-http").exists());
        assert!(!launcher_dir.join("tab-cache").exists());

        let desktop = fs::read_to_string(fx.path("desktop_file")).unwrap();
        assert!(desktop.contains("Name=Acme"));
        assert!(fx
            .dir
            .path()
            .join("home/.local/share/icons/hicolor/64x64/apps/Acme.png")
            .exists());
    }

    #[test]
    fn test_existing_profile_is_reused() {
        let mut fx = launcher_fixture(desktop_host("'Acme'\n"), &[]);
        create_launcher(&mut fx.context).unwrap();

        let commands = fx.commands();
        let list_update = format!("{} set {} list ", GSETTINGS, PROFILES_LIST);
        assert!(!commands.iter().any(|c| c.starts_with(&list_update)));
        assert!(commands
            .iter()
            .any(|c| c.starts_with(&format!("{} set {} font", GSETTINGS, profile_path("b1c2")))));
    }
}
