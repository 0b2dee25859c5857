use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::{
    build_program, CameraPose, DecayRates, FragmentSource, InputRates, KeyBindings, Palette,
    Renderer, RendererConfig, ShaderProgram, Vec2, ViewDefaults, ViewerSettings,
};
use tracing_subscriber::EnvFilter;
use viewconfig::ViewerFile;

use crate::cli::{CheckArgs, RunArgs};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let file = load_viewer_file(args.config.as_deref())?;
    let mut config = renderer_config_from_file(&file)?;
    if let Some(path) = args.shader {
        config.fragment = FragmentSource::File(path);
    }
    if let Some(size) = args.size {
        config.surface_size = size;
    }

    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        fragment = ?config.fragment,
        "starting mandelview"
    );
    Renderer::new(config).run()
}

pub fn check(args: CheckArgs) -> Result<()> {
    let fragment = args
        .shader
        .map(FragmentSource::File)
        .unwrap_or(FragmentSource::Bundled);
    let program = build_program(&fragment).context("shader check failed")?;
    print_program(&program);
    Ok(())
}

fn print_program(program: &ShaderProgram) {
    let (group, binding) = program.uniform_block();
    println!("Shader program ready");
    println!("Uniform block: group {group}, binding {binding}");
    for slot in program.uniform_slots() {
        println!(
            "  {:<10} offset={:<3} type={}",
            slot.name.glsl_name(),
            slot.offset,
            slot.kind
        );
    }
}

/// Reads the config named on the command line, or the default config file
/// when it exists.
pub fn load_viewer_file(explicit: Option<&Path>) -> Result<ViewerFile> {
    if let Some(path) = explicit {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        return parse_viewer_file(&contents, path);
    }

    let path = AppPaths::discover()?.config_file();
    match fs::read_to_string(&path) {
        Ok(contents) => parse_viewer_file(&contents, &path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file; using built-in defaults");
            Ok(ViewerFile::default())
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    }
}

fn parse_viewer_file(contents: &str, path: &Path) -> Result<ViewerFile> {
    let file = ViewerFile::from_toml_str(contents)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(file)
}

pub fn renderer_config_from_file(file: &ViewerFile) -> Result<RendererConfig> {
    let palette = Palette::new(file.palette.colors.clone())
        .context("palette must contain at least one colour")?;
    let bindings = KeyBindings::from_names(file.keys.iter().map(|(action, keys)| {
        (action.as_str(), keys.iter().map(String::as_str))
    }))
    .context("invalid key bindings")?;

    let view = &file.view;
    let preset = &file.preset;
    let settings = ViewerSettings {
        defaults: ViewDefaults {
            pose: CameraPose::new(
                Vec2::new(view.center[0], view.center[1]),
                view.rotation,
                view.zoom,
            ),
            iterations: view.iterations,
        },
        preset: CameraPose::new(
            Vec2::new(preset.center[0], preset.center[1]),
            preset.rotation,
            preset.zoom,
        ),
        input_rates: InputRates {
            angular: file.rates.angular,
            iterations: file.rates.iterations,
        },
        decay_rates: DecayRates {
            position: file.smoothing.position,
            orientation: file.smoothing.orientation,
        },
    };

    Ok(RendererConfig {
        palette,
        settings,
        bindings,
        ..RendererConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::ViewAction;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn default_file_maps_to_default_renderer_config() {
        let config = renderer_config_from_file(&ViewerFile::default()).expect("config");
        assert_eq!(config.settings, ViewerSettings::default());
        assert_eq!(config.palette, Palette::default());
        assert_eq!(config.bindings, KeyBindings::default());
        assert_eq!(config.surface_size, (800, 600));
        assert_eq!(config.fragment, FragmentSource::Bundled);
    }

    #[test]
    fn custom_file_overrides_settings_and_keys() {
        let file = ViewerFile::from_toml_str(
            r#"
[view]
zoom = 4.0

[smoothing]
position = 8.0

[keys]
quit = ["q"]
fewer_iterations = ["minus"]
"#,
        )
        .expect("parse");
        let config = renderer_config_from_file(&file).expect("config");
        assert_eq!(config.settings.defaults.pose.zoom, 4.0);
        assert_eq!(config.settings.decay_rates.position, 8.0);
        assert_eq!(config.settings.decay_rates.orientation, 1.5);
        assert_eq!(
            config.bindings.keys_for(ViewAction::Quit),
            KeyBindings::from_names([("quit", ["q"])])
                .expect("bindings")
                .keys_for(ViewAction::Quit)
        );
    }

    #[test]
    fn unknown_key_names_fail_mapping() {
        let file = ViewerFile::from_toml_str("[keys]\nquit = [\"hyperspace\"]\n").expect("parse");
        assert!(renderer_config_from_file(&file).is_err());
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let root = TempDir::new().unwrap();
        let missing: PathBuf = root.path().join("missing.toml");
        assert!(load_viewer_file(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_config_path_is_parsed() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("viewer.toml");
        fs::write(&path, "[rates]\nangular = 0.5\n").unwrap();
        let file = load_viewer_file(Some(&path)).expect("load");
        assert_eq!(file.rates.angular, 0.5);
    }
}
