use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;

/// Load a typed configuration from `.env`, an optional `<file_stem>.{toml,yaml,json}`
/// file and `<ENV_PREFIX>__SECTION__KEY` environment variables, in that order of
/// precedence (later wins). `defaults` are applied underneath all sources.
pub fn load_layered<T: DeserializeOwned>(
    file_stem: &str,
    env_prefix: &str,
    defaults: &[(&str, config::Value)],
) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let mut builder = Cfg::builder();
    for (key, value) in defaults {
        builder = builder.set_default(*key, value.clone())?;
    }

    let config = builder
        .add_source(File::with_name(file_stem).required(false))
        .add_source(Environment::with_prefix(env_prefix).separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}
