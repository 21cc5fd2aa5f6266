use anyhow::Result;
use searchbody::BuilderConfig;

pub fn run() -> Result<String> {
    Ok(toml::to_string_pretty(&BuilderConfig::default())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_loader() {
        let text = run().unwrap();
        let config = BuilderConfig::from_toml_str(&text).unwrap();
        assert_eq!(config, BuilderConfig::default());
    }
}
