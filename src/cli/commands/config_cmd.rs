//! Configuration commands.

use fsbo::config::Config;

use crate::cli::icons::dim_arrow;

/// Print the effective configuration (file + environment) as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => eprintln!("{} Loaded from {}", dim_arrow(), path.display()),
        None => eprintln!("{} No config file found, showing defaults", dim_arrow()),
    }

    let rendered = toml::to_string_pretty(config)?;
    print!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(rendered.contains("pages = 5"));
        assert!(rendered.contains("[selectors]"));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.pages, 5);
        assert_eq!(parsed.selectors, Config::default().selectors);
    }
}
