/// Reconciler behaviour switches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Skip a "no such grant" failure of the grant-option revoke when the spec
    /// was applied without grant option. Off by default: every failure of the
    /// first revoke aborts Remove.
    pub tolerate_missing_grant_option: bool,
}

impl ReconcilerConfig {
    pub fn builder() -> ReconcilerConfigBuilder {
        ReconcilerConfigBuilder::default()
    }
}

/// Builder for ReconcilerConfig.
#[derive(Default)]
pub struct ReconcilerConfigBuilder {
    config: ReconcilerConfig,
}

impl ReconcilerConfigBuilder {
    pub fn tolerate_missing_grant_option(mut self, tolerate: bool) -> Self {
        self.config.tolerate_missing_grant_option = tolerate;
        self
    }

    pub fn build(self) -> ReconcilerConfig {
        self.config
    }
}
