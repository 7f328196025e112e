//! Chrome command-line arguments and WebDriver capabilities.

use serde_json::json;
use unfold_common::BrowserConfig;
use webdriver::capabilities::Capabilities;

/// Construct Chrome command-line arguments for a deployment's browser settings.
pub fn build_chrome_arguments(config: &BrowserConfig) -> Vec<String> {
    let mut args = Vec::new();
    if config.headless {
        args.push("--headless".to_string());
    }
    if config.disable_gpu {
        args.push("--disable-gpu".to_string());
    }
    if config.no_sandbox {
        args.push("--no-sandbox".to_string());
    }
    args.push("--disable-dev-shm-usage".to_string());
    args.push(format!(
        "--window-size={},{}",
        config.viewport.width, config.viewport.height
    ));
    args.extend(config.extra_args.iter().cloned());
    args
}

/// `goog:chromeOptions` capabilities for a new session.
pub fn chrome_capabilities(config: &BrowserConfig) -> Capabilities {
    let mut chrome_opts = serde_json::Map::new();
    chrome_opts.insert("args".to_string(), json!(build_chrome_arguments(config)));
    if let Some(binary) = &config.chromium_path {
        chrome_opts.insert("binary".to_string(), json!(binary.display().to_string()));
    }

    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
    caps
}
