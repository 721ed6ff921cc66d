pub mod decode;
pub mod encode;
pub mod init;
pub mod run;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use toolweave_codecs::Dialect;
use toolweave_config::AppConfig;
use toolweave_core::Codec;

/// Read a whole file, or stdin when no path is given.
pub fn read_input(file: Option<&Path>) -> std::io::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Build the codec for `dialect`, falling back to the configured dialect.
pub fn codec_for(dialect: Option<Dialect>) -> Result<Arc<dyn Codec>, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let dialect = match dialect {
        Some(dialect) => dialect,
        None => config.dialect()?,
    };
    Ok(dialect.build(&config.codec_options()?))
}
