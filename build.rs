use std::fs;
use std::path::Path;

const CONFIG_HEADER: &str = "pota_config.h";
const ROOT_CA: &str = "certs/root_ca.pem";

const CONFIG_KEYS: [&str; 6] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "POTA_DEVICE_TYPE",
    "POTA_FIRMWARE_VERSION",
    "POTA_AUTH_TOKEN",
    "POTA_SERVER_SECRET",
];

fn main() -> anyhow::Result<()> {
    // Necessary for ESP-IDF
    #[cfg(feature = "esp-idf")]
    embuild::espidf::sysenv::output();

    println!("cargo:rerun-if-changed={}", CONFIG_HEADER);
    println!("cargo:rerun-if-changed={}", ROOT_CA);

    // Read device configuration if it exists
    let contents = if Path::new(CONFIG_HEADER).exists() {
        fs::read_to_string(CONFIG_HEADER)?
    } else {
        println!("cargo:warning=pota_config.h not found! Copy pota_config.h.example to pota_config.h and add your credentials.");
        String::new()
    };

    for key in CONFIG_KEYS {
        let value = define_value(&contents, key).unwrap_or_default();
        println!("cargo:rustc-env={}={}", key, value);
    }

    // The PEM spans several lines, so it travels through OUT_DIR instead of rustc-env
    let out_dir = std::env::var("OUT_DIR")?;
    let pem = if Path::new(ROOT_CA).exists() {
        fs::read_to_string(ROOT_CA)?
    } else {
        println!("cargo:warning=certs/root_ca.pem not found! Update checks will fail with CertificateMissing.");
        String::new()
    };
    fs::write(Path::new(&out_dir).join("root_ca.pem"), pem)?;

    Ok(())
}

fn define_value(contents: &str, key: &str) -> Option<String> {
    let needle = format!("#define {}", key);
    contents
        .lines()
        .find(|l| {
            l.trim_start()
                .strip_prefix(&needle)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
        })
        .and_then(|l| l.split('"').nth(1))
        .map(str::to_string)
}
