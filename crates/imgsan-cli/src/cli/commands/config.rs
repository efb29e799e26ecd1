use std::path::Path;

use anyhow::Result;
use imgsan_core::config::{Config, paths};

pub fn path(explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", paths::config_path()?.display()),
    }
    Ok(())
}

pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}
