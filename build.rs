use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Smallest page size any supported backend reports.
const MIN_PAGE_SIZE: usize = 4096;

#[derive(Deserialize, Default)]
struct ConfigSection {
    alignment: Option<usize>,
    default_reserve_size: Option<usize>,
}

#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    config: ConfigSection,
}

struct ResolvedConfig {
    alignment: usize,
    default_reserve_size: usize,
}

fn resolve_config(cfg: &ConfigSection) -> ResolvedConfig {
    let alignment = cfg.alignment.unwrap_or(16);
    assert!(
        alignment.is_power_of_two(),
        "alignment ({}) must be a power of 2",
        alignment
    );
    assert!(
        (8..=MIN_PAGE_SIZE).contains(&alignment),
        "alignment ({}) must be between 8 and {}",
        alignment,
        MIN_PAGE_SIZE
    );

    let default_reserve_size = cfg.default_reserve_size.unwrap_or(1024 * 1024 * 1024);
    assert!(default_reserve_size > 0, "default_reserve_size must be > 0");
    assert!(
        default_reserve_size % MIN_PAGE_SIZE == 0,
        "default_reserve_size ({}) must be a multiple of {}",
        default_reserve_size,
        MIN_PAGE_SIZE
    );

    ResolvedConfig {
        alignment,
        default_reserve_size,
    }
}

fn default_config_path() -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    format!("{}/vmarena.toml", manifest_dir)
}

fn generate_config(cfg: &ResolvedConfig, out_path: &Path) {
    let code = format!(
        "// Auto-generated by build.rs. Do not edit.\n\n\
         pub const ALIGNMENT: usize = {};\n\
         pub const DEFAULT_RESERVE_SIZE: usize = {};\n",
        cfg.alignment, cfg.default_reserve_size,
    );
    fs::write(out_path, code).expect("failed to write config_gen.rs");
}

fn main() {
    println!("cargo:rerun-if-env-changed=VMARENA_CONFIG");

    let out_dir = env::var("OUT_DIR").unwrap();

    let config_path = env::var("VMARENA_CONFIG").unwrap_or_else(|_| default_config_path());
    println!("cargo:rerun-if-changed={}", config_path);
    let content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", config_path, e));

    let config: Config = toml::from_str(&content).expect("failed to parse TOML config");
    let resolved = resolve_config(&config.config);

    generate_config(&resolved, &Path::new(&out_dir).join("config_gen.rs"));
}
