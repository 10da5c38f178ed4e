//! Implementation of the `ccw config` command

use ccw_core::config::CONFIG_FILE;
use ccw_core::{Config, ConfigKey};

use crate::commands::build_manager;
use crate::output::{ConfigData, JsonResponse};

/// Run the config command
///
/// No key prints everything; a key alone prints its value; key and value
/// set, save, and print the result.
pub fn run_config(
    key: Option<String>,
    value: Option<String>,
    reset: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let mut manager = build_manager(json_output)?;
    let path = manager.root().join(CONFIG_FILE);

    if reset {
        manager.reset_config()?;
    } else if let Some(key) = key {
        let key: ConfigKey = key.parse()?;
        match value {
            Some(value) => {
                manager.set_config(key, &value)?;
            }
            None => {
                if json_output {
                    let data = serde_json::json!({ "key": key.as_str(), "value": manager.config().get(key) });
                    JsonResponse::ok("config", data).print()?;
                } else if !quiet {
                    println!("{}", manager.config().get(key));
                }
                return Ok(0);
            }
        }
    }

    let config = manager.config().clone();
    if json_output {
        JsonResponse::ok("config", ConfigData { path, config }).print()?;
    } else if !quiet {
        print!("{}", render(&config));
    }

    Ok(0)
}

/// `key=value` lines in [`ConfigKey::ALL`] order
fn render(config: &Config) -> String {
    ConfigKey::ALL
        .iter()
        .map(|key| format!("{}={}\n", key, config.get(*key)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let text = render(&Config::default());
        assert_eq!(
            text,
            "repos_dir=~/github\nsecondary_tool=lazygit\nskip_permissions=false\ngit_timeout_secs=120\nlock_timeout_ms=5000\n"
        );
    }
}
