/// Keys under which guild settings are stored. The `config current` command
/// only displays whitelisted keys, so additions here should also be
/// considered there.
pub mod keys {
    pub const MIN_LIVING_MINUTES: &str = "min_living_minutes";
    pub const VERIFIED_ROLE: &str = "verified_role";
    pub const VERIFIED_LIVING_ROLE: &str = "verified_living_role";
    pub const INSTRUCTIONS_LINK: &str = "instructions_link";
    pub const WELCOME_GREETING: &str = "welcome_greeting";
    pub const DISABLED_GREETING: &str = "disabled_greeting";
    pub const BUNKER_WARNING: &str = "bunker_warning";
    pub const BUNKER: &str = "bunker";
    pub const DISABLED: &str = "disabled";
    pub const WELCOME_CHANNEL: &str = "welcome_channel";
}

/// Immutable snapshot of one guild's configuration, taken once per command
/// invocation. Mutation happens through the store, never through this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    /// Living minutes a player needs before the qualified role is granted.
    pub min_living_minutes: i64,
    /// Role granted on any successful verification.
    pub verified_role: Option<u64>,
    /// Role granted only once the minutes threshold is met.
    pub verified_living_role: Option<u64>,
    pub instructions_link: String,
    pub welcome_greeting: String,
    pub disabled_greeting: String,
    pub bunker_warning: String,
    pub bunker: bool,
    pub disabled: bool,
    pub welcome_channel: Option<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        GuildSettings {
            min_living_minutes: 60,
            verified_role: None,
            verified_living_role: None,
            instructions_link: String::new(),
            welcome_greeting: String::new(),
            disabled_greeting: String::new(),
            bunker_warning: String::new(),
            bunker: false,
            disabled: false,
            welcome_channel: None,
        }
    }
}
