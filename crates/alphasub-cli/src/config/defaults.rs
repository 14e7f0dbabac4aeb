use alphasub::job::{ModelSettings, MsaSettings};

pub struct DefaultsConfig {
    pub do_models: bool,
    pub msa: MsaSettings,
    pub model: ModelSettings,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            do_models: true,
            msa: MsaSettings::default(),
            model: ModelSettings::default(),
        }
    }
}
